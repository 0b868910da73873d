use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("Validation error: {0}")]
    Validation(#[source] ValidationError),

    #[error("Contact not found: {0}")]
    NotFound(String),

    #[error("Remote mode unavailable: no base URL configured")]
    RemoteUnavailable,

    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Invalid import: {0}")]
    InvalidImport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("phone must contain at least {min} digits: {phone}")]
    InvalidPhone { phone: String, min: usize },
}

impl From<ValidationError> for ContactError {
    fn from(e: ValidationError) -> Self {
        ContactError::Validation(e)
    }
}

impl From<reqwest::Error> for ContactError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ContactError::Timeout(e.to_string())
        } else if e.is_connect() {
            ContactError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            ContactError::Http {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ContactError::Network(e.to_string())
        }
    }
}

impl ContactError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ContactError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, ContactError>;
