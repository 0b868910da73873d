use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{ContactStore, Slot};
use crate::contact::{Contact, ValidDraft, new_id};
use crate::error::{ContactError, Result};

/// Contacts persisted as one JSON array in a [`Slot`].
///
/// The slot is the source of truth: every operation re-reads it, and every
/// change rewrites the full array.
pub struct LocalStore {
    slot: Box<dyn Slot>,
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(slot: impl Slot + 'static) -> Self {
        Self {
            slot: Box::new(slot),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the stored list, or an empty one if the slot is absent or
    /// unreadable.
    pub fn read(&self) -> Vec<Contact> {
        let data = match self.slot.load() {
            Ok(Some(data)) => data,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read slot {}: {}", self.slot.key(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&data) {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!("Discarding corrupt slot {}: {}", self.slot.key(), e);
                Vec::new()
            }
        }
    }

    /// Persists the full list. Failures are logged and otherwise ignored.
    pub fn write(&self, contacts: &[Contact]) {
        let data = match serde_json::to_string(contacts) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize contacts: {}", e);
                return;
            }
        };
        if let Err(e) = self.slot.save(&data) {
            warn!("Failed to write slot {}: {}", self.slot.key(), e);
            return;
        }
        debug!("Wrote {} contacts to slot {}", contacts.len(), self.slot.key());
    }

    pub async fn insert(&self, draft: &ValidDraft) -> Contact {
        let _guard = self.write_lock.lock().await;
        let mut contacts = self.read();
        let mut contact = Contact::from_draft(draft.clone());
        while contacts.iter().any(|c| c.id == contact.id) {
            contact.id = new_id();
        }
        contacts.push(contact.clone());
        self.write(&contacts);
        info!("Created contact {}", contact.id);
        contact
    }

    pub async fn modify(&self, id: &str, draft: &ValidDraft) -> Result<Contact> {
        let _guard = self.write_lock.lock().await;
        let mut contacts = self.read();
        let contact = contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ContactError::NotFound(id.to_string()))?;
        contact.apply(draft.clone());
        let updated = contact.clone();
        self.write(&contacts);
        info!("Updated contact {}", id);
        Ok(updated)
    }

    /// Returns whether a record was removed.
    pub async fn remove(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut contacts = self.read();
        let before = contacts.len();
        contacts.retain(|c| c.id != id);
        let removed = contacts.len() != before;
        if removed {
            self.write(&contacts);
            info!("Deleted contact {}", id);
        }
        removed
    }

    /// Adds records, giving a fresh id to any that collide with a stored one.
    pub async fn append(&self, incoming: Vec<Contact>) -> Vec<Contact> {
        let _guard = self.write_lock.lock().await;
        let mut contacts = self.read();
        let mut ids: HashSet<String> = contacts.iter().map(|c| c.id.clone()).collect();
        for mut contact in incoming {
            while ids.contains(&contact.id) {
                contact.id = new_id();
            }
            ids.insert(contact.id.clone());
            contacts.push(contact);
        }
        self.write(&contacts);
        contacts
    }

    pub async fn replace_all(&self, contacts: Vec<Contact>) -> Vec<Contact> {
        let _guard = self.write_lock.lock().await;
        self.write(&contacts);
        contacts
    }
}

#[async_trait]
impl ContactStore for LocalStore {
    async fn list(&self, _query: &str) -> Result<Vec<Contact>> {
        Ok(self.read())
    }

    async fn create(&self, draft: &ValidDraft) -> Result<Vec<Contact>> {
        self.insert(draft).await;
        Ok(self.read())
    }

    async fn update(&self, id: &str, draft: &ValidDraft) -> Result<Vec<Contact>> {
        self.modify(id, draft).await?;
        Ok(self.read())
    }

    async fn delete(&self, id: &str) -> Result<Vec<Contact>> {
        self.remove(id).await;
        Ok(self.read())
    }
}
