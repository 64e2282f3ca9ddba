//! Upload task: send local files matching a filemask to Drive.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{DriveError, Result};
use crate::filemask::FileMask;
use crate::models::{TransferOutput, UploadResult};
use crate::pipeline::{self, FailurePolicy, FileOperation};
use crate::session::{DriveEndpoints, DriveSession};

/// Input of the Upload task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UploadInput {
    /// Directory whose top-level files are candidates for upload.
    #[serde(default)]
    pub source_directory: PathBuf,

    /// Shell-style filemask (`*`, `?`); absent or blank selects every file.
    #[serde(default)]
    pub file_mask: Option<String>,

    /// Drive folder the files are created in; absent or blank means no parent.
    #[serde(default)]
    pub target_folder_id: Option<String>,

    /// Service account key JSON, or the path of a file containing it.
    #[serde(rename = "ServiceAccountKeyJSON", default)]
    pub service_account_key_json: String,

    #[serde(default)]
    pub include_shared_drives: bool,
}

/// Options of the Upload task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UploadOptions {
    /// Stop at the first failed upload instead of collecting error messages.
    pub throw_error_on_failure: bool,

    /// Fail when no file in the source directory matches the filemask.
    pub throw_error_if_no_match: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            throw_error_on_failure: super::default_true(),
            throw_error_if_no_match: false,
        }
    }
}

struct UploadOperation<'a> {
    input: &'a UploadInput,
    options: &'a UploadOptions,
}

impl UploadOperation<'_> {
    fn matching_files(&self) -> Result<Vec<PathBuf>> {
        let mask = FileMask::new(self.input.file_mask.as_deref())?;
        let files = mask.matching_files(&self.input.source_directory)?;

        if files.is_empty() && self.options.throw_error_if_no_match {
            return Err(DriveError::NoMatch {
                mask: mask.as_str().to_string(),
            });
        }

        Ok(files)
    }

    fn target_folder(&self) -> Option<&str> {
        self.input
            .target_folder_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[async_trait]
impl<'a> FileOperation for UploadOperation<'a> {
    type Item = PathBuf;
    type Output = UploadResult;

    const ACTION: &'static str = "uploading";

    fn validate(&self) -> Result<()> {
        let dir = &self.input.source_directory;
        if dir.as_os_str().is_empty() || !dir.is_dir() {
            return Err(DriveError::Configuration(format!(
                "Source path not found. (SourceDirectory: {})",
                dir.display()
            )));
        }
        Ok(())
    }

    fn policy(&self) -> FailurePolicy {
        FailurePolicy::from_throw_on_failure(self.options.throw_error_on_failure)
    }

    fn enumerate_local(&self) -> Option<Result<Vec<PathBuf>>> {
        Some(self.matching_files())
    }

    fn item_name(item: &PathBuf) -> String {
        file_name(item)
    }

    async fn apply(&self, session: &DriveSession, item: &PathBuf) -> Result<UploadResult> {
        let id = session
            .upload_file(item, self.target_folder(), self.input.include_shared_drives)
            .await?;

        Ok(UploadResult {
            uploaded_file_id: id,
            uploaded_file_name: file_name(item),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Upload the files in `input.source_directory` that match `input.file_mask`.
pub async fn upload(
    input: &UploadInput,
    options: &UploadOptions,
    cancel: &CancellationToken,
) -> Result<TransferOutput<UploadResult>> {
    upload_with(&DriveEndpoints::default(), input, options, cancel).await
}

pub async fn upload_with(
    endpoints: &DriveEndpoints,
    input: &UploadInput,
    options: &UploadOptions,
    cancel: &CancellationToken,
) -> Result<TransferOutput<UploadResult>> {
    let op = UploadOperation { input, options };
    let outcome = pipeline::run(&op, &input.service_account_key_json, endpoints, cancel).await?;

    Ok(TransferOutput {
        success: outcome.success(),
        data: outcome.succeeded,
        error_message: outcome.errors,
    })
}
