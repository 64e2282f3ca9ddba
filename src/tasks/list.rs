//! List task: enumerate files and return them as a JSON map keyed by id.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{ListOutput, ListedFile, RemoteFile};
use crate::pipeline::{self, FileOperation};
use crate::session::{DriveEndpoints, DriveSession};

const LIST_FIELDS: &str = "nextPageToken, files(id, name, size, version, createdTime, mimeType)";

/// Input of the List task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListInput {
    /// Service account key JSON, or the path of a file containing it.
    #[serde(rename = "ServiceAccountKeyJSON", default)]
    pub service_account_key_json: String,

    /// Drive query; absent or `*` lists everything.
    #[serde(default)]
    pub file_query: Option<String>,

    #[serde(default)]
    pub include_shared_drives: bool,
}

struct ListOperation<'a> {
    input: &'a ListInput,
}

#[async_trait]
impl<'a> FileOperation for ListOperation<'a> {
    type Item = RemoteFile;
    type Output = ListedFile;

    const ACTION: &'static str = "listing";

    async fn enumerate(&self, session: &DriveSession) -> Result<Vec<RemoteFile>> {
        let files = session
            .list_files(
                self.input.file_query.as_deref(),
                LIST_FIELDS,
                self.input.include_shared_drives,
            )
            .await?;

        Ok(files.into_iter().filter(|f| !f.is_folder()).collect())
    }

    fn item_name(item: &RemoteFile) -> String {
        item.name.clone()
    }

    async fn apply(&self, _session: &DriveSession, item: &RemoteFile) -> Result<ListedFile> {
        Ok(ListedFile::from(item.clone()))
    }
}

/// Serialize listed files into one JSON object keyed by file id.
pub fn serialize_listing(files: Vec<ListedFile>) -> Result<String> {
    let by_id: BTreeMap<String, ListedFile> =
        files.into_iter().map(|f| (f.id.clone(), f)).collect();
    Ok(serde_json::to_string(&by_id)?)
}

/// List the non-folder files matched by `input.file_query`.
pub async fn list(input: &ListInput, cancel: &CancellationToken) -> Result<ListOutput> {
    list_with(&DriveEndpoints::default(), input, cancel).await
}

pub async fn list_with(
    endpoints: &DriveEndpoints,
    input: &ListInput,
    cancel: &CancellationToken,
) -> Result<ListOutput> {
    let op = ListOperation { input };
    let outcome = pipeline::run(&op, &input.service_account_key_json, endpoints, cancel).await?;

    Ok(ListOutput {
        success: true,
        data: serialize_listing(outcome.succeeded)?,
    })
}
