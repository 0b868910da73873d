pub mod query;

pub use query::*;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

pub const MIN_PHONE_DIGITS: usize = 7;

static PHONE_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9+]").expect("phone strip pattern is valid"));

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A person record as held by either store and shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "notas", default)]
    pub notes: Option<String>,
    #[serde(
        rename = "creado",
        alias = "creado_en",
        default = "Utc::now",
        with = "timestamp"
    )]
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn from_draft(draft: ValidDraft) -> Self {
        Self {
            id: new_id(),
            name: draft.name,
            phone: draft.phone,
            email: draft.email,
            notes: draft.notes,
            created_at: Utc::now(),
        }
    }

    /// Overwrites the editable fields, keeping id and creation time.
    pub fn apply(&mut self, draft: ValidDraft) {
        self.name = draft.name;
        self.phone = draft.phone;
        self.email = draft.email;
        self.notes = draft.notes;
    }

    pub fn created_at_iso(&self) -> String {
        format_timestamp(&self.created_at)
    }

    /// Rebuilds a contact from an untrusted JSON object.
    ///
    /// Strings are trimmed, the phone is re-validated and normalized, and a
    /// missing id or timestamp is regenerated. Returns `None` when the record
    /// has no usable name or phone.
    pub fn sanitize(raw: &Map<String, Value>) -> Option<Self> {
        let name = field(raw, &["nombre", "name"])?;
        let phone = field(raw, &["telefono", "phone"])?;
        let draft = ContactDraft {
            name,
            phone,
            email: field(raw, &["email"]),
            notes: field(raw, &["notas", "notes"]),
        }
        .validate()
        .ok()?;

        let id = field(raw, &["id"]).unwrap_or_else(new_id);
        let created_at = ["creado", "creado_en", "created_at"]
            .iter()
            .find_map(|key| raw.get(*key))
            .and_then(timestamp_from_value)
            .unwrap_or_else(Utc::now);

        Some(Self {
            id,
            name: draft.name,
            phone: draft.phone,
            email: draft.email,
            notes: draft.notes,
            created_at,
        })
    }
}

/// Unvalidated form input for creating or editing a contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A draft that passed validation; every field is already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl ContactDraft {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            email: None,
            notes: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<ValidDraft, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !is_valid_phone(&self.phone) {
            return Err(ValidationError::InvalidPhone {
                phone: self.phone.clone(),
                min: MIN_PHONE_DIGITS,
            });
        }
        Ok(ValidDraft {
            name: name.to_string(),
            phone: normalize_phone(&self.phone),
            email: non_empty(self.email.as_deref()),
            notes: non_empty(self.notes.as_deref()),
        })
    }
}

impl From<&Contact> for ContactDraft {
    fn from(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            email: contact.email.clone(),
            notes: contact.notes.clone(),
        }
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn normalize_phone(phone: &str) -> String {
    PHONE_STRIP.replace_all(phone, "").into_owned()
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses `value` or falls back to the current time.
pub fn normalize_timestamp(value: Option<&str>) -> DateTime<Utc> {
    value.and_then(parse_timestamp).unwrap_or_else(Utc::now)
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Strings are parsed as dates, numbers as epoch milliseconds.
pub(crate) fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn field(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| match raw.get(*key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(dt))
    }

    /// Never fails: unreadable values become the current time.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(super::timestamp_from_value(&value).unwrap_or_else(Utc::now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn phone_needs_seven_digits() {
        assert!(is_valid_phone("1234567"));
        assert!(is_valid_phone("+52 (33) 12-34"));
        assert!(is_valid_phone("a1b2c3d4e5f6g7"));
        assert!(!is_valid_phone("123456"));
        assert!(!is_valid_phone("+-() "));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn phone_normalization_keeps_digits_and_plus() {
        assert_eq!(normalize_phone("33 1234 5678"), "3312345678");
        assert_eq!(normalize_phone("+52 (33) 1234-5678"), "+523312345678");
        assert_eq!(normalize_phone("tel: 555.123.4567 ext"), "5551234567");
    }

    #[test]
    fn draft_validation() {
        let valid = ContactDraft::new("  Ana ", "33 1234 5678")
            .with_email("  ")
            .with_notes(" vecina ")
            .validate()
            .unwrap();
        assert_eq!(valid.name, "Ana");
        assert_eq!(valid.phone, "3312345678");
        assert_eq!(valid.email, None);
        assert_eq!(valid.notes.as_deref(), Some("vecina"));

        assert_eq!(
            ContactDraft::new("   ", "3312345678").validate(),
            Err(ValidationError::EmptyName)
        );
        assert!(matches!(
            ContactDraft::new("Bob", "123").validate(),
            Err(ValidationError::InvalidPhone { min: 7, .. })
        ));
    }

    #[test]
    fn timestamps_parse_in_common_shapes() {
        assert!(parse_timestamp("2024-03-01T10:20:30.123Z").is_some());
        assert!(parse_timestamp("2024-03-01T10:20:30+02:00").is_some());
        assert!(parse_timestamp("2024-03-01 10:20:30").is_some());
        assert!(parse_timestamp("2024-03-01T10:20:30").is_some());
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn invalid_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let dt = normalize_timestamp(Some("not a date"));
        assert!(dt >= before);
        let kept = normalize_timestamp(Some("2020-01-02T03:04:05Z"));
        assert_eq!(format_timestamp(&kept), "2020-01-02T03:04:05.000Z");
    }

    #[test]
    fn contact_serializes_with_ui_field_names() {
        let contact = Contact::from_draft(
            ContactDraft::new("Ana", "3312345678").validate().unwrap(),
        );
        let value = serde_json::to_value(&contact).unwrap();
        assert_eq!(value["nombre"], "Ana");
        assert_eq!(value["telefono"], "3312345678");
        assert!(value["email"].is_null());
        assert!(value.get("creado").is_some());
    }

    #[test]
    fn contact_with_bad_timestamp_still_deserializes() {
        let before = Utc::now();
        let contact: Contact = serde_json::from_value(json!({
            "id": "x1",
            "nombre": "Ana",
            "telefono": "3312345678",
            "creado": "garbage"
        }))
        .unwrap();
        assert!(contact.created_at >= before);
        assert_eq!(contact.notes, None);
    }

    #[test]
    fn sanitize_fills_missing_id_and_drops_bad_records() {
        let raw = json!({ "nombre": " Carla ", "telefono": "55-1234-5678", "email": "c@x.mx" });
        let contact = Contact::sanitize(raw.as_object().unwrap()).unwrap();
        assert!(!contact.id.is_empty());
        assert_eq!(contact.name, "Carla");
        assert_eq!(contact.phone, "5512345678");
        assert_eq!(contact.email.as_deref(), Some("c@x.mx"));

        let bad = json!({ "nombre": "Bob", "telefono": "123" });
        assert!(Contact::sanitize(bad.as_object().unwrap()).is_none());

        let nameless = json!({ "telefono": "5512345678" });
        assert!(Contact::sanitize(nameless.as_object().unwrap()).is_none());
    }

    #[test]
    fn sanitize_keeps_valid_id_and_timestamp() {
        let raw = json!({
            "id": "abc",
            "nombre": "Dana",
            "telefono": "+1 555 000 1111",
            "creado_en": "2023-05-06T07:08:09Z"
        });
        let contact = Contact::sanitize(raw.as_object().unwrap()).unwrap();
        assert_eq!(contact.id, "abc");
        assert_eq!(contact.phone, "+15550001111");
        assert_eq!(contact.created_at_iso(), "2023-05-06T07:08:09.000Z");
    }
}
