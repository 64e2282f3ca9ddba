//! Delete task: permanently delete every file a query matches.
//!
//! Files are deleted without passing through the trash. A folder target also
//! removes its descendants owned by the service account. The first failing
//! deletion aborts the task; deletions already made stay made.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{DeleteOutput, DeleteResult, RemoteFile};
use crate::pipeline::{self, FileOperation};
use crate::session::{DriveEndpoints, DriveSession};

const LIST_FIELDS: &str = "nextPageToken, files(id, kind, name, size, version, createdTime, mimeType)";

/// Input of the Delete task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteInput {
    /// Drive query selecting the files to delete; absent or `*` selects all.
    #[serde(default)]
    pub file_query: Option<String>,

    /// Service account key JSON, or the path of a file containing it.
    #[serde(rename = "ServiceAccountKeyJSON", default)]
    pub service_account_key_json: String,

    #[serde(default)]
    pub include_shared_drives: bool,
}

struct DeleteOperation<'a> {
    input: &'a DeleteInput,
}

#[async_trait]
impl<'a> FileOperation for DeleteOperation<'a> {
    type Item = RemoteFile;
    type Output = DeleteResult;

    const ACTION: &'static str = "deleting";

    async fn enumerate(&self, session: &DriveSession) -> Result<Vec<RemoteFile>> {
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

    async fn apply(&self, session: &DriveSession, item: &RemoteFile) -> Result<DeleteResult> {
        session
            .delete_file(&item.id, self.input.include_shared_drives)
            .await?;

        Ok(DeleteResult {
            file_id: item.id.clone(),
            filename: item.name.clone(),
        })
    }
}

/// Delete the files matched by `input.file_query` against Google Drive.
pub async fn delete(input: &DeleteInput, cancel: &CancellationToken) -> Result<DeleteOutput> {
    delete_with(&DriveEndpoints::default(), input, cancel).await
}

pub async fn delete_with(
    endpoints: &DriveEndpoints,
    input: &DeleteInput,
    cancel: &CancellationToken,
) -> Result<DeleteOutput> {
    let op = DeleteOperation { input };
    let outcome = pipeline::run(&op, &input.service_account_key_json, endpoints, cancel).await?;

    // Reaching this point means every matched file was deleted.
    Ok(DeleteOutput {
        success: true,
        data: outcome.succeeded,
    })
}
