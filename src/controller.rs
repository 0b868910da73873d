use tracing::{info, warn};

use crate::contact::{Contact, ContactDraft, SortField, SortState, ValidDraft, matches};
use crate::error::{ContactError, Result};
use crate::store::{ContactStore, LocalStore, RemoteStore, StoreMode};
use crate::transfer::{ImportReport, export_contacts, parse_import};

/// Outcome of deleting every record one call at a time.
#[derive(Debug, Clone, Default)]
pub struct ClearReport {
    pub deleted: usize,
    pub failed: Vec<(String, String)>,
}

impl ClearReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Keeps the visible contact list in step with whichever store is active.
///
/// The loaded list is never patched locally; after every mutation it is
/// replaced by what the store reports.
pub struct ContactBook {
    local: LocalStore,
    remote: Option<RemoteStore>,
    mode: StoreMode,
    contacts: Vec<Contact>,
    search: String,
    sort: SortState,
}

impl ContactBook {
    pub fn new(local: LocalStore, remote: Option<RemoteStore>) -> Self {
        Self {
            local,
            remote,
            mode: StoreMode::Local,
            contacts: Vec::new(),
            search: String::new(),
            sort: SortState::default(),
        }
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
    }

    /// Toggle-style sort selection, as a column header click.
    pub fn sort_by(&mut self, field: SortField) {
        self.sort.select(field);
    }

    /// Everything the active store returned on the last load.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn active(&self) -> Result<&dyn ContactStore> {
        match self.mode {
            StoreMode::Local => Ok(&self.local as &dyn ContactStore),
            StoreMode::Remote => self
                .remote
                .as_ref()
                .map(|r| r as &dyn ContactStore)
                .ok_or(ContactError::RemoteUnavailable),
        }
    }

    fn remote(&self) -> Result<&RemoteStore> {
        self.remote.as_ref().ok_or(ContactError::RemoteUnavailable)
    }

    /// Switches the backing store and reloads from it.
    pub async fn set_mode(&mut self, mode: StoreMode) -> Result<()> {
        if mode == StoreMode::Remote && self.remote.is_none() {
            return Err(ContactError::RemoteUnavailable);
        }
        info!("Switching to {} mode", mode);
        self.mode = mode;
        self.reload().await
    }

    /// Replaces the loaded list. Remote stores get the search text as a filter.
    pub async fn reload(&mut self) -> Result<()> {
        let query = match self.mode {
            StoreMode::Local => "",
            StoreMode::Remote => self.search.as_str(),
        };
        let contacts = self.active()?.list(query).await?;
        self.contacts = contacts;
        Ok(())
    }

    /// Remote mode filters on the server and re-fetches; local mode filters
    /// the already-loaded list in [`ContactBook::visible`].
    pub async fn set_search(&mut self, text: impl Into<String>) -> Result<()> {
        self.search = text.into();
        if self.mode == StoreMode::Remote {
            self.reload().await?;
        }
        Ok(())
    }

    /// The loaded list after client-side filtering (local mode only) and sorting.
    pub fn visible(&self) -> Vec<Contact> {
        let mut list: Vec<Contact> = match self.mode {
            StoreMode::Local => self
                .contacts
                .iter()
                .filter(|c| matches(c, &self.search))
                .cloned()
                .collect(),
            StoreMode::Remote => self.contacts.clone(),
        };
        self.sort.sort(&mut list);
        list
    }

    /// Creates a contact, or updates `id` when given.
    pub async fn submit(&mut self, draft: &ContactDraft, id: Option<&str>) -> Result<()> {
        let valid = draft.validate()?;
        let contacts = match id {
            Some(id) => self.active()?.update(id, &valid).await?,
            None => self.active()?.create(&valid).await?,
        };
        self.accept(contacts).await
    }

    pub async fn delete(&mut self, id: &str) -> Result<()> {
        let contacts = self.active()?.delete(id).await?;
        self.accept(contacts).await
    }

    /// Removes every record. The remote API has no bulk endpoint, so each
    /// record is deleted on its own and failures are collected, not fatal.
    pub async fn clear_all(&mut self) -> Result<ClearReport> {
        let mut report = ClearReport::default();
        match self.mode {
            StoreMode::Local => {
                report.deleted = self.local.read().len();
                self.local.replace_all(Vec::new()).await;
            }
            StoreMode::Remote => {
                let remote = self.remote()?;
                for contact in remote.fetch("").await? {
                    match remote.delete_one(&contact.id).await {
                        Ok(()) => report.deleted += 1,
                        Err(e) => {
                            warn!("Failed to delete contact {}: {}", contact.id, e);
                            report.failed.push((contact.id, e.to_string()));
                        }
                    }
                }
            }
        }
        info!("Cleared {} contacts ({} failed)", report.deleted, report.failed.len());
        self.reload().await?;
        Ok(report)
    }

    /// Imports a JSON document into the active store.
    pub async fn import(&mut self, data: &str) -> Result<ImportReport> {
        let batch = parse_import(data)?;
        let imported = batch.contacts.len();
        match self.mode {
            StoreMode::Local => {
                self.local.append(batch.contacts).await;
            }
            StoreMode::Remote => {
                let remote = self.remote()?;
                for contact in &batch.contacts {
                    let valid: ValidDraft = ContactDraft::from(contact).validate()?;
                    remote.create_one(&valid).await?;
                }
            }
        }
        info!("Imported {} contacts, skipped {}", imported, batch.skipped);
        self.reload().await?;
        Ok(ImportReport {
            imported,
            skipped: batch.skipped,
        })
    }

    /// Serializes the loaded records as `{"contactos": [...]}`.
    pub fn export(&self) -> Result<String> {
        export_contacts(&self.contacts)
    }

    pub async fn health(&self) -> bool {
        match &self.remote {
            Some(remote) => remote.health().await,
            None => false,
        }
    }

    async fn accept(&mut self, contacts: Vec<Contact>) -> Result<()> {
        self.contacts = contacts;
        // remote writes come back unfiltered; restore the server-side filter
        if self.mode == StoreMode::Remote && !self.search.trim().is_empty() {
            self.reload().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::SortDirection;
    use crate::store::MemorySlot;

    fn local_book() -> ContactBook {
        ContactBook::new(LocalStore::new(MemorySlot::new("contactos")), None)
    }

    #[tokio::test]
    async fn submit_in_local_mode_normalizes_phone() {
        let mut book = local_book();
        let before = chrono::Utc::now();
        book.submit(&ContactDraft::new("Ana", "33 1234 5678"), None)
            .await
            .unwrap();

        assert_eq!(book.contacts().len(), 1);
        let ana = &book.contacts()[0];
        assert_eq!(ana.name, "Ana");
        assert_eq!(ana.phone, "3312345678");
        assert!(ana.created_at >= before);
        assert!(crate::contact::parse_timestamp(&ana.created_at_iso()).is_some());
    }

    #[tokio::test]
    async fn validation_failure_touches_nothing() {
        let mut book = local_book();
        let err = book
            .submit(&ContactDraft::new("", "3312345678"), None)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = book
            .submit(&ContactDraft::new("Bob", "12-34"), None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(book.contacts().is_empty());
    }

    #[tokio::test]
    async fn edit_and_delete_reload_the_list() {
        let mut book = local_book();
        book.submit(&ContactDraft::new("Ana", "3312345678"), None)
            .await
            .unwrap();
        let id = book.contacts()[0].id.clone();

        book.submit(&ContactDraft::new("Ana B", "3312345678"), Some(&id))
            .await
            .unwrap();
        assert_eq!(book.contacts()[0].name, "Ana B");

        book.delete(&id).await.unwrap();
        assert!(book.contacts().is_empty());
    }

    #[tokio::test]
    async fn remote_mode_needs_base_url() {
        let mut book = local_book();
        assert!(!book.has_remote());
        let err = book.set_mode(StoreMode::Remote).await.unwrap_err();
        assert!(matches!(err, ContactError::RemoteUnavailable));
        assert_eq!(book.mode(), StoreMode::Local);
        assert!(!book.health().await);
    }

    #[tokio::test]
    async fn local_search_filters_without_reload() {
        let mut book = local_book();
        book.submit(&ContactDraft::new("Ana", "3312345678"), None)
            .await
            .unwrap();
        book.submit(&ContactDraft::new("Bob", "5512345678").with_email("bob@x.mx"), None)
            .await
            .unwrap();

        book.set_search("BOB").await.unwrap();
        assert_eq!(book.contacts().len(), 2);
        let visible = book.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Bob");

        book.set_search("").await.unwrap();
        assert_eq!(book.visible().len(), 2);
    }

    #[tokio::test]
    async fn visible_follows_sort_state() {
        let mut book = local_book();
        for name in ["carla", "Ana", "bob"] {
            book.submit(&ContactDraft::new(name, "3312345678"), None)
                .await
                .unwrap();
        }
        let names: Vec<_> = book.visible().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["Ana", "bob", "carla"]);

        book.sort_by(SortField::Name);
        assert_eq!(book.sort_state().direction, SortDirection::Descending);
        let names: Vec<_> = book.visible().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["carla", "bob", "Ana"]);
    }

    #[tokio::test]
    async fn clear_all_local() {
        let mut book = local_book();
        book.submit(&ContactDraft::new("Ana", "3312345678"), None)
            .await
            .unwrap();
        book.submit(&ContactDraft::new("Bob", "5512345678"), None)
            .await
            .unwrap();

        let report = book.clear_all().await.unwrap();
        assert_eq!(report.deleted, 2);
        assert!(report.is_complete());
        assert!(book.contacts().is_empty());
    }

    #[tokio::test]
    async fn import_skips_invalid_records() {
        let mut book = local_book();
        let report = book
            .import(r#"{"contactos":[{"nombre":"Bob","telefono":"123"}]}"#)
            .await
            .unwrap();
        assert_eq!(report, ImportReport { imported: 0, skipped: 1 });
        assert!(book.contacts().is_empty());

        let report = book
            .import(r#"[{"nombre":"Ana","telefono":"3312345678"}]"#)
            .await
            .unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(book.contacts().len(), 1);
    }

    #[tokio::test]
    async fn export_round_trips_through_import() {
        let mut book = local_book();
        book.submit(
            &ContactDraft::new("Ana", "3312345678").with_notes("prima"),
            None,
        )
        .await
        .unwrap();
        let data = book.export().unwrap();

        let mut other = local_book();
        other.import(&data).await.unwrap();
        assert_eq!(other.contacts()[0].name, "Ana");
        assert_eq!(other.contacts()[0].notes.as_deref(), Some("prima"));
    }
}
