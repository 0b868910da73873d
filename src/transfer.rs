//! JSON import and export of contact lists.
//!
//! Exports are written as `{"contactos": [...]}`. Imports accept that shape or
//! a bare array, and every record is sanitized on the way in.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::contact::Contact;
use crate::error::{ContactError, Result};

pub const EXPORT_KEY: &str = "contactos";

#[derive(Serialize)]
struct ExportFile<'a> {
    contactos: &'a [Contact],
}

/// Sanitized records from an import file, plus how many were dropped.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub contacts: Vec<Contact>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

pub fn export_contacts(contacts: &[Contact]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ExportFile { contactos: contacts })?)
}

pub fn parse_import(data: &str) -> Result<ImportBatch> {
    let value: Value = serde_json::from_str(data)
        .map_err(|e| ContactError::InvalidImport(format!("not valid JSON: {}", e)))?;

    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove(EXPORT_KEY) {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(ContactError::InvalidImport(format!(
                    "expected an array or an object with a \"{}\" array",
                    EXPORT_KEY
                )));
            }
        },
        _ => {
            return Err(ContactError::InvalidImport(
                "expected an array or an object".to_string(),
            ));
        }
    };

    let total = records.len();
    let contacts: Vec<Contact> = records
        .iter()
        .filter_map(Value::as_object)
        .filter_map(Contact::sanitize)
        .collect();
    let skipped = total - contacts.len();
    debug!("Parsed import: {} accepted, {} skipped", contacts.len(), skipped);

    Ok(ImportBatch { contacts, skipped })
}
