//! Resolution of the service account key input.
//!
//! The key arrives as a single string that is either the JSON document
//! itself or the path of a file containing it.

use std::path::Path;

use tracing::debug;

use crate::error::{DriveError, Result};
use crate::models::ServiceAccountCredentials;

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// Resolve a key input into parsed service account credentials.
///
/// Fails with [`DriveError::Configuration`] for blank input and with
/// [`DriveError::CredentialFormat`] when the bytes are not a service account key.
pub async fn resolve_credentials(raw: &str) -> Result<ServiceAccountCredentials> {
    if raw.trim().is_empty() {
        return Err(DriveError::Configuration(
            "Service account key missing.".to_string(),
        ));
    }

    let bytes = if Path::new(raw).is_file() {
        debug!(path = raw, "Reading service account key from file");
        tokio::fs::read(raw).await?
    } else {
        raw.as_bytes().to_vec()
    };

    parse_credentials(&bytes)
}

/// Parse service account key bytes.
pub fn parse_credentials(bytes: &[u8]) -> Result<ServiceAccountCredentials> {
    let credentials: ServiceAccountCredentials = serde_json::from_slice(bytes).map_err(|e| {
        DriveError::CredentialFormat(format!("Error deserializing JSON credential data: {e}"))
    })?;

    if let Some(kind) = credentials.account_type.as_deref() {
        if kind != SERVICE_ACCOUNT_TYPE {
            return Err(DriveError::CredentialFormat(format!(
                "Expected credential type '{SERVICE_ACCOUNT_TYPE}', found '{kind}'"
            )));
        }
    }

    Ok(credentials)
}
