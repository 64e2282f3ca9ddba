//! Download task: fetch every file a query matches into a local directory.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{DriveError, Result};
use crate::models::{DownloadResult, RemoteFile, TransferOutput};
use crate::pipeline::{self, FailurePolicy, FileOperation};
use crate::session::{DriveEndpoints, DriveSession};

const LIST_FIELDS: &str = "nextPageToken, files(id, name, size, version, createdTime, mimeType)";

/// Input of the Download task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DownloadInput {
    /// Service account key JSON, or the path of a file containing it.
    #[serde(rename = "ServiceAccountKeyJSON", default)]
    pub service_account_key_json: String,

    /// Drive query; absent or `*` downloads everything.
    #[serde(default)]
    pub file_query: Option<String>,

    /// Local directory the files are written into, named as in Drive.
    #[serde(default)]
    pub destination_directory: PathBuf,

    #[serde(default)]
    pub include_shared_drives: bool,
}

/// Options of the Download task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DownloadOptions {
    /// Stop at the first failed download instead of collecting error messages.
    pub throw_error_on_failure: bool,

    /// Create the destination directory when it does not exist.
    pub create_destination_folder: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            throw_error_on_failure: super::default_true(),
            create_destination_folder: false,
        }
    }
}

struct DownloadOperation<'a> {
    input: &'a DownloadInput,
    options: &'a DownloadOptions,
}

#[async_trait]
impl<'a> FileOperation for DownloadOperation<'a> {
    type Item = RemoteFile;
    type Output = DownloadResult;

    const ACTION: &'static str = "downloading";

    fn validate(&self) -> Result<()> {
        let dir = &self.input.destination_directory;
        if dir.as_os_str().is_empty() || (!dir.is_dir() && !self.options.create_destination_folder)
        {
            return Err(DriveError::Configuration(format!(
                "Destination directory doesn't exist. (DestinationDirectory: {})",
                dir.display()
            )));
        }
        Ok(())
    }

    fn policy(&self) -> FailurePolicy {
        FailurePolicy::from_throw_on_failure(self.options.throw_error_on_failure)
    }

    async fn enumerate(&self, session: &DriveSession) -> Result<Vec<RemoteFile>> {
        let dir = &self.input.destination_directory;
        if !dir.is_dir() {
            info!(path = %dir.display(), "Creating destination directory");
            tokio::fs::create_dir_all(dir).await?;
        }

        session
            .list_files(
                self.input.file_query.as_deref(),
                LIST_FIELDS,
                self.input.include_shared_drives,
            )
            .await
    }

    fn item_name(item: &RemoteFile) -> String {
        item.name.clone()
    }

    async fn apply(&self, session: &DriveSession, item: &RemoteFile) -> Result<DownloadResult> {
        session
            .download_file(
                item,
                &self.input.destination_directory,
                self.input.include_shared_drives,
            )
            .await?;

        Ok(DownloadResult {
            downloaded_file_id: item.id.clone(),
            downloaded_filename: item.name.clone(),
        })
    }
}

/// Download the files matched by `input.file_query` into
/// `input.destination_directory`.
pub async fn download(
    input: &DownloadInput,
    options: &DownloadOptions,
    cancel: &CancellationToken,
) -> Result<TransferOutput<DownloadResult>> {
    download_with(&DriveEndpoints::default(), input, options, cancel).await
}

pub async fn download_with(
    endpoints: &DriveEndpoints,
    input: &DownloadInput,
    options: &DownloadOptions,
    cancel: &CancellationToken,
) -> Result<TransferOutput<DownloadResult>> {
    let op = DownloadOperation { input, options };
    let outcome = pipeline::run(&op, &input.service_account_key_json, endpoints, cancel).await?;

    Ok(TransferOutput {
        success: outcome.success(),
        data: outcome.succeeded,
        error_message: outcome.errors,
    })
}
