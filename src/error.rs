//! Error types for the drive_tasks crate.

use thiserror::Error;

/// Errors that can occur while running a Drive task.
#[derive(Error, Debug)]
pub enum DriveError {
    /// Required input is missing or points at something that does not exist.
    #[error("{0}")]
    Configuration(String),

    #[error("Invalid service account key: {0}")]
    CredentialFormat(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Error {action} file: {name}. Error: {source}")]
    ItemFailed {
        action: &'static str,
        name: String,
        #[source]
        source: Box<DriveError>,
    },

    #[error("No files match the filemask '{mask}' within supplied path.")]
    NoMatch { mask: String },

    /// A remote file name that would not stay inside the local destination.
    #[error("Unsafe file name '{0}': must be a single path component")]
    UnsafeFileName(String),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JWT encoding error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Invalid filemask: {0}")]
    InvalidFileMask(#[from] glob::PatternError),
}

impl DriveError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, DriveError::Configuration(_))
    }

    pub fn is_credential_format(&self) -> bool {
        matches!(self, DriveError::CredentialFormat(_))
    }

    /// The remote status code, looking through per-item wrapping.
    pub fn api_status(&self) -> Option<u16> {
        match self {
            DriveError::Api { status, .. } => Some(*status),
            DriveError::ItemFailed { source, .. } => source.api_status(),
            _ => None,
        }
    }
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
