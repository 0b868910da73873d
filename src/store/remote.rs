use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::ContactStore;
use crate::contact::{Contact, ContactDraft, ValidDraft, format_timestamp, timestamp_from_value};
use crate::error::{ContactError, Result};

/// A contact as the REST API sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireContact {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub telefono: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notas: Option<String>,
    #[serde(default)]
    pub creado_en: Option<Value>,
}

impl From<WireContact> for Contact {
    fn from(wire: WireContact) -> Self {
        let created_at = wire
            .creado_en
            .as_ref()
            .and_then(timestamp_from_value)
            .unwrap_or_else(Utc::now);
        Self {
            id: wire.id,
            name: wire.nombre,
            phone: wire.telefono,
            email: wire.email,
            notes: wire.notas,
            created_at,
        }
    }
}

impl From<&Contact> for WireContact {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id.clone(),
            nombre: contact.name.clone(),
            telefono: contact.phone.clone(),
            email: contact.email.clone(),
            notas: contact.notes.clone(),
            creado_en: Some(Value::String(format_timestamp(&contact.created_at))),
        }
    }
}

/// Request body for create and update. Absent optionals go out as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePayload {
    pub nombre: String,
    pub telefono: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notas: Option<String>,
}

impl From<&ValidDraft> for WirePayload {
    fn from(draft: &ValidDraft) -> Self {
        Self {
            nombre: draft.name.clone(),
            telefono: draft.phone.clone(),
            email: draft.email.clone(),
            notas: draft.notes.clone(),
        }
    }
}

impl From<WirePayload> for ContactDraft {
    fn from(payload: WirePayload) -> Self {
        Self {
            name: payload.nombre,
            phone: payload.telefono,
            email: payload.email,
            notes: payload.notas,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthPayload {
    #[serde(default)]
    pub ok: bool,
}

const ERROR_BODY_LIMIT: usize = 200;

/// First line of an error response, cut to a printable length.
fn error_excerpt(text: &str) -> String {
    let line = text.trim().lines().next().unwrap_or_default().trim();
    let mut excerpt: String = line.chars().take(ERROR_BODY_LIMIT).collect();
    if excerpt.len() < text.trim().len() {
        excerpt.push_str("...");
    }
    excerpt
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid contact id: {}", other))),
    }
}

/// Client for the contacts REST API.
#[derive(Clone)]
pub struct RemoteStore {
    base_url: String,
    client: Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn contact_url(&self, id: &str) -> String {
        self.url(&format!("/contacts/{}", urlencoding::encode(id)))
    }

    async fn send(&self, method: Method, url: &str, body: Option<&WirePayload>) -> Result<String> {
        let mut req = self.client.request(method.clone(), url);
        if let Some(json) = body {
            req = req.json(json);
        }

        debug!("Contacts API request: {} {}", method, url);

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        debug!("Contacts API response: {} - {}", status, text);

        if !(status.is_success() || status == StatusCode::NO_CONTENT) {
            return Err(ContactError::Http {
                status: status.as_u16(),
                body: error_excerpt(&text),
            });
        }
        Ok(text)
    }

    /// Fetches the list, filtered server-side when `query` is not blank.
    pub async fn fetch(&self, query: &str) -> Result<Vec<Contact>> {
        let query = query.trim();
        let url = if query.is_empty() {
            self.url("/contacts")
        } else {
            self.url(&format!("/contacts?q={}", urlencoding::encode(query)))
        };
        let text = self.send(Method::GET, &url, None).await?;
        let records: Vec<WireContact> = serde_json::from_str(&text)?;
        Ok(records.into_iter().map(Contact::from).collect())
    }

    /// Posts one record without re-fetching the list.
    pub async fn create_one(&self, draft: &ValidDraft) -> Result<()> {
        let body = WirePayload::from(draft);
        self.send(Method::POST, &self.url("/contacts"), Some(&body)).await?;
        Ok(())
    }

    /// Deletes one record without re-fetching the list.
    pub async fn delete_one(&self, id: &str) -> Result<()> {
        self.send(Method::DELETE, &self.contact_url(id), None).await?;
        Ok(())
    }

    /// `true` only when the API answers with `{"ok": true}`.
    pub async fn health(&self) -> bool {
        let url = self.url("/");
        match self.send(Method::GET, &url, None).await {
            Ok(text) => serde_json::from_str::<HealthPayload>(&text)
                .map(|h| h.ok)
                .unwrap_or(false),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl ContactStore for RemoteStore {
    async fn list(&self, query: &str) -> Result<Vec<Contact>> {
        self.fetch(query).await
    }

    async fn create(&self, draft: &ValidDraft) -> Result<Vec<Contact>> {
        self.create_one(draft).await?;
        self.fetch("").await
    }

    async fn update(&self, id: &str, draft: &ValidDraft) -> Result<Vec<Contact>> {
        let body = WirePayload::from(draft);
        self.send(Method::PUT, &self.contact_url(id), Some(&body)).await?;
        self.fetch("").await
    }

    async fn delete(&self, id: &str) -> Result<Vec<Contact>> {
        self.delete_one(id).await?;
        self.fetch("").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_contact_maps_timestamp_field() {
        let wire: WireContact = serde_json::from_value(json!({
            "id": 42,
            "nombre": "Ana",
            "telefono": "3312345678",
            "email": null,
            "notas": "x",
            "creado_en": "2024-01-02 03:04:05"
        }))
        .unwrap();
        let contact = Contact::from(wire);
        assert_eq!(contact.id, "42");
        assert_eq!(contact.email, None);
        assert_eq!(contact.notes.as_deref(), Some("x"));
        assert_eq!(contact.created_at_iso(), "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn invalid_server_timestamp_becomes_now() {
        let before = Utc::now();
        let wire: WireContact = serde_json::from_value(json!({
            "id": "a",
            "nombre": "Ana",
            "telefono": "3312345678",
            "creado_en": "??"
        }))
        .unwrap();
        assert!(Contact::from(wire).created_at >= before);
    }

    #[test]
    fn payload_sends_nulls_for_absent_fields() {
        let draft = ContactDraft::new("Ana", "33 1234 5678").validate().unwrap();
        let value = serde_json::to_value(WirePayload::from(&draft)).unwrap();
        assert_eq!(
            value,
            json!({ "nombre": "Ana", "telefono": "3312345678", "email": null, "notas": null })
        );
    }

    #[test]
    fn error_bodies_are_cut_short() {
        assert_eq!(error_excerpt("  not found\n"), "not found");
        assert_eq!(error_excerpt(""), "");

        let page = format!("<!DOCTYPE html>\n<html>{}</html>", "x".repeat(1000));
        assert_eq!(error_excerpt(&page), "<!DOCTYPE html>...");

        let long = "e".repeat(500);
        let excerpt = error_excerpt(&long);
        assert_eq!(excerpt.chars().count(), ERROR_BODY_LIMIT + 3);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let store = RemoteStore::new("http://localhost:3000/api/");
        assert_eq!(store.base_url(), "http://localhost:3000/api");
        assert_eq!(store.contact_url("a b"), "http://localhost:3000/api/contacts/a%20b");
    }

    #[tokio::test]
    async fn health_is_false_when_unreachable() {
        let store = RemoteStore::new("http://127.0.0.1:1");
        assert!(!store.health().await);
    }
}
