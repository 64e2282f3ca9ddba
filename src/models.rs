//! Data models for Google Drive API responses and task results.

use serde::{Deserialize, Serialize};

/// Mime type Drive uses to mark folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A file or folder returned by a listing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_int64")]
    pub size: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_int64")]
    pub version: Option<u64>,
    #[serde(default)]
    pub created_time: Option<String>,
}

impl RemoteFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

// Drive encodes int64 fields as JSON strings.
fn deserialize_int64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<RemoteFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Response body of a finished upload. Only `id` is requested.
#[derive(Debug, Deserialize)]
pub struct CreatedFile {
    pub id: String,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Service account key as generated in the Google Cloud console.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// One deleted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteResult {
    pub file_id: String,
    pub filename: String,
}

/// One downloaded item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DownloadResult {
    pub downloaded_file_id: String,
    pub downloaded_filename: String,
}

/// One uploaded item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UploadResult {
    pub uploaded_file_id: String,
    pub uploaded_file_name: String,
}

/// Value stored per id in the List task's serialized map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListedFile {
    pub id: String,
    pub name: String,
    pub size: Option<u64>,
    pub version: Option<u64>,
    pub created_time: Option<String>,
}

impl From<RemoteFile> for ListedFile {
    fn from(file: RemoteFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            size: file.size,
            version: file.version,
            created_time: file.created_time,
        }
    }
}

/// Result of the Delete task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteOutput {
    pub success: bool,
    pub data: Vec<DeleteResult>,
}

/// Result of the List task. `data` is a JSON object keyed by file id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListOutput {
    pub success: bool,
    pub data: String,
}

/// Result of the Upload and Download tasks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransferOutput<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub error_message: Vec<String>,
}
