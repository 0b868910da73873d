use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const DEFAULT_SLOT_KEY: &str = "contactos";

/// A single persisted blob addressed by a fixed key.
pub trait Slot: Send + Sync {
    fn key(&self) -> &str;

    /// `Ok(None)` when nothing has been written yet.
    fn load(&self) -> io::Result<Option<String>>;

    fn save(&self, data: &str) -> io::Result<()>;
}

/// Stores the blob as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSlot {
    key: String,
    path: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl AsRef<Path>, key: impl Into<String>) -> Self {
        let key = key.into();
        let path = dir.as_ref().join(format!("{}.json", key));
        Self { key, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Slot for FileSlot {
    fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Writes a sibling temp file and renames it over the target, so readers
    /// see either the old blob or the new one, never a truncated file.
    fn save(&self, data: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)
    }
}

#[derive(Debug, Default)]
pub struct MemorySlot {
    key: String,
    data: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: Mutex::new(None),
        }
    }

    pub fn with_data(key: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: Mutex::new(Some(data.into())),
        }
    }
}

impl Slot for MemorySlot {
    fn key(&self) -> &str {
        &self.key
    }

    fn load(&self) -> io::Result<Option<String>> {
        let data = self
            .data
            .lock()
            .map_err(|_| io::Error::other("memory slot poisoned"))?;
        Ok(data.clone())
    }

    fn save(&self, data: &str) -> io::Result<()> {
        let mut slot = self
            .data
            .lock()
            .map_err(|_| io::Error::other("memory slot poisoned"))?;
        *slot = Some(data.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_slot_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path(), DEFAULT_SLOT_KEY);
        assert!(slot.load().unwrap().is_none());
        assert!(slot.path().ends_with("contactos.json"));
    }

    #[test]
    fn file_slot_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("nested/data"), "k");
        slot.save("[]").unwrap();
        assert_eq!(slot.load().unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn file_slot_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path(), "k");
        slot.save("[1]").unwrap();
        slot.save("[2]").unwrap();
        assert_eq!(slot.load().unwrap().as_deref(), Some("[2]"));

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("k.json")]);
    }

    #[test]
    fn memory_slot_overwrites() {
        let slot = MemorySlot::with_data("k", "a");
        slot.save("b").unwrap();
        assert_eq!(slot.load().unwrap().as_deref(), Some("b"));
        assert_eq!(slot.key(), "k");
    }
}
