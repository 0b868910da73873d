mod local;
mod remote;
mod slot;

pub use local::*;
pub use remote::*;
pub use slot::*;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::contact::{Contact, ValidDraft};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreMode::Local => f.write_str("local"),
            StoreMode::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StoreMode::Local),
            "remote" | "api" => Ok(StoreMode::Remote),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// A backing store for the contact list.
///
/// Every mutation hands back the whole list as re-read from the store, so
/// callers never patch their copy in place.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// `query` is a server-side filter; stores that cannot filter ignore it.
    async fn list(&self, query: &str) -> Result<Vec<Contact>>;

    async fn create(&self, draft: &ValidDraft) -> Result<Vec<Contact>>;

    async fn update(&self, id: &str, draft: &ValidDraft) -> Result<Vec<Contact>>;

    async fn delete(&self, id: &str) -> Result<Vec<Contact>>;
}
