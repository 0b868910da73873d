use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::Contact;

/// Case-insensitive substring match over name, phone, email and notes.
/// An empty (or all-whitespace) query matches everything.
pub fn matches(contact: &Contact, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [
        Some(contact.name.as_str()),
        Some(contact.phone.as_str()),
        contact.email.as_deref(),
        contact.notes.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|haystack| haystack.to_lowercase().contains(&needle))
}

pub fn filter<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    contacts.iter().filter(|c| matches(c, query)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Name,
    Phone,
    Email,
    Notes,
    CreatedAt,
}

impl SortField {
    fn key(&self, contact: &Contact) -> String {
        match self {
            SortField::Name => contact.name.to_lowercase(),
            SortField::Phone => contact.phone.to_lowercase(),
            SortField::Email => contact.email.as_deref().unwrap_or("").to_lowercase(),
            SortField::Notes => contact.notes.as_deref().unwrap_or("").to_lowercase(),
            SortField::CreatedAt => contact.created_at_iso().to_lowercase(),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortField::Name => "name",
            SortField::Phone => "phone",
            SortField::Email => "email",
            SortField::Notes => "notes",
            SortField::CreatedAt => "created",
        };
        f.write_str(name)
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" | "nombre" => Ok(SortField::Name),
            "phone" | "telefono" => Ok(SortField::Phone),
            "email" => Ok(SortField::Email),
            "notes" | "notas" => Ok(SortField::Notes),
            "created" | "created_at" | "creado" => Ok(SortField::CreatedAt),
            other => Err(format!("unknown sort field: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Same field flips the direction; a different field starts ascending.
    pub fn select(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.toggled();
        } else {
            self.field = field;
            self.direction = SortDirection::Ascending;
        }
    }

    pub fn compare(&self, a: &Contact, b: &Contact) -> Ordering {
        let ord = self.field.key(a).cmp(&self.field.key(b));
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }

    /// Stable sort; ties keep their incoming order in both directions.
    pub fn sort(&self, contacts: &mut [Contact]) {
        contacts.sort_by(|a, b| self.compare(a, b));
    }
}
