//! Per-invocation authenticated access to the Google Drive v3 API.

use std::future::Future;
use std::path::{Component, Path};

use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Client, Response};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{
    format_size, ApiErrorResponse, CreatedFile, FileListResponse, RemoteFile,
    ServiceAccountCredentials,
};

/// Base URL for Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API.
pub const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Largest page a single listing request asks for.
pub const LIST_PAGE_SIZE: u32 = 1000;

/// Query value that stands for "no filter".
pub const MATCH_ALL_QUERY: &str = "*";

/// Where Drive requests are sent.
#[derive(Debug, Clone)]
pub struct DriveEndpoints {
    pub api_base: String,
    pub upload_base: String,
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: UPLOAD_API_BASE.to_string(),
        }
    }
}

/// An authenticated Drive session scoped to one task invocation.
///
/// Every remote call is raced against the session's cancellation token.
/// The session is released when dropped.
pub struct DriveSession {
    auth: Authenticator,
    http: Client,
    endpoints: DriveEndpoints,
    cancel: CancellationToken,
}

impl DriveSession {
    /// Open a session. No network traffic happens until the first request.
    pub fn open(
        credentials: ServiceAccountCredentials,
        endpoints: DriveEndpoints,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let http = Client::new();
        let auth = Authenticator::new(credentials, http.clone())?;
        debug!(service_account = %auth.client_email(), "Drive session opened");

        Ok(Self {
            auth,
            http,
            endpoints,
            cancel,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn guarded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DriveError::Cancelled),
            result = fut => result,
        }
    }

    /// Issue one listing request.
    ///
    /// `query` is handed to Drive verbatim. A blank query or `*` is omitted,
    /// which enumerates everything visible to the service account.
    pub async fn list_files(
        &self,
        query: Option<&str>,
        fields: &str,
        include_shared_drives: bool,
    ) -> Result<Vec<RemoteFile>> {
        self.guarded(async {
            let token = self.auth.get_access_token().await?;
            let shared = include_shared_drives.to_string();
            let page_size = LIST_PAGE_SIZE.to_string();

            let mut request = self
                .http
                .get(format!("{}/files", self.endpoints.api_base))
                .bearer_auth(&token)
                .query(&[
                    ("fields", fields),
                    ("pageSize", page_size.as_str()),
                    ("supportsAllDrives", shared.as_str()),
                    ("includeItemsFromAllDrives", shared.as_str()),
                ]);

            if let Some(q) = query.filter(|q| !is_match_all(q)) {
                request = request.query(&[("q", q)]);
            }

            let response = check_status(request.send().await?).await?;
            let list_response: FileListResponse = response.json().await?;
            debug!(count = list_response.files.len(), "Listed files");
            if list_response.next_page_token.is_some() {
                debug!(page_size = LIST_PAGE_SIZE, "More files match than one page holds");
            }
            Ok(list_response.files)
        })
        .await
    }

    /// Permanently delete a file, skipping the trash.
    pub async fn delete_file(&self, file_id: &str, include_shared_drives: bool) -> Result<()> {
        self.guarded(async {
            let token = self.auth.get_access_token().await?;

            let response = self
                .http
                .delete(format!("{}/files/{}", self.endpoints.api_base, file_id))
                .bearer_auth(&token)
                .query(&[("supportsAllDrives", include_shared_drives.to_string())])
                .send()
                .await?;

            check_status(response).await?;
            Ok(())
        })
        .await
    }

    /// Stream a file's content into `destination_dir/<file name>`.
    ///
    /// An existing local file with that name is truncated. A name that is not
    /// a single plain path component is rejected before any request. Returns
    /// the number of bytes written.
    pub async fn download_file(
        &self,
        file: &RemoteFile,
        destination_dir: &Path,
        include_shared_drives: bool,
    ) -> Result<u64> {
        let local_name = local_file_name(&file.name)?;

        self.guarded(async {
            let token = self.auth.get_access_token().await?;

            let response = self
                .http
                .get(format!("{}/files/{}", self.endpoints.api_base, file.id))
                .bearer_auth(&token)
                .query(&[
                    ("alt", "media".to_string()),
                    ("supportsAllDrives", include_shared_drives.to_string()),
                ])
                .send()
                .await?;

            let response = check_status(response).await?;

            let final_path = destination_dir.join(local_name);
            let mut local = File::create(&final_path).await?;
            let mut stream = response.bytes_stream();
            let mut downloaded: u64 = 0;

            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                local.write_all(&chunk).await?;
                downloaded += chunk.len() as u64;
                debug!(file = %file.name, bytes = downloaded, "Download progress");
            }

            local.flush().await?;
            info!(
                file = %file.name,
                size = %format_size(downloaded),
                path = %final_path.display(),
                "Download complete"
            );

            Ok(downloaded)
        })
        .await
    }

    /// Upload a local file as a new Drive object and return its id.
    ///
    /// Uses a resumable session so the file body is streamed from disk.
    pub async fn upload_file(
        &self,
        local_path: &Path,
        parent_id: Option<&str>,
        include_shared_drives: bool,
    ) -> Result<String> {
        self.guarded(async {
            let filename = local_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    DriveError::Configuration(format!(
                        "Not a valid file name: {}",
                        local_path.display()
                    ))
                })?;

            let token = self.auth.get_access_token().await?;
            let file_size = tokio::fs::metadata(local_path).await?.len();
            let mime_type = mime_guess::from_path(local_path)
                .first_or_octet_stream()
                .to_string();

            let mut metadata = serde_json::json!({ "name": filename });
            if let Some(parent) = parent_id {
                metadata["parents"] = serde_json::json!([parent]);
            }

            // Step 1: Initiate resumable upload
            let init_response = self
                .http
                .post(format!("{}/files", self.endpoints.upload_base))
                .bearer_auth(&token)
                .query(&[
                    ("uploadType", "resumable".to_string()),
                    ("supportsAllDrives", include_shared_drives.to_string()),
                ])
                .header("X-Upload-Content-Type", &mime_type)
                .header("X-Upload-Content-Length", file_size.to_string())
                .json(&metadata)
                .send()
                .await?;

            let init_response = check_status(init_response).await?;

            let upload_url = init_response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| DriveError::Api {
                    status: init_response.status().as_u16(),
                    message: "No upload URL in response".to_string(),
                })?
                .to_string();

            // Step 2: Stream the file content
            let body = Body::wrap_stream(ReaderStream::new(File::open(local_path).await?));

            let upload_response = self
                .http
                .put(&upload_url)
                .bearer_auth(&token)
                .header(CONTENT_TYPE, &mime_type)
                .header(CONTENT_LENGTH, file_size.to_string())
                .query(&[("fields", "id")])
                .body(body)
                .send()
                .await?;

            let created: CreatedFile = check_status(upload_response).await?.json().await?;
            info!(
                file = filename,
                id = %created.id,
                size = %format_size(file_size),
                "Upload complete"
            );

            Ok(created.id)
        })
        .await
    }
}

impl Drop for DriveSession {
    fn drop(&mut self) {
        debug!(service_account = %self.auth.client_email(), "Drive session released");
    }
}

/// `name` as a path that cannot leave the directory it is joined onto.
fn local_file_name(name: &str) -> Result<&Path> {
    let path = Path::new(name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(path),
        _ => Err(DriveError::UnsafeFileName(name.to_string())),
    }
}

fn is_match_all(query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || query == MATCH_ALL_QUERY
}

/// Turn a non-success response into [`DriveError::Api`], preferring the
/// message from Google's error envelope.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return Err(DriveError::Api {
            status: api_error.error.code,
            message: api_error.error.message,
        });
    }

    Err(DriveError::Api {
        status: status.as_u16(),
        message: error_body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_all_queries() {
        assert!(is_match_all(""));
        assert!(is_match_all("  "));
        assert!(is_match_all("*"));
        assert!(!is_match_all("name = 'x'"));
    }

    #[test]
    fn plain_names_stay_local() {
        assert_eq!(local_file_name("report.pdf").unwrap(), Path::new("report.pdf"));
        assert!(local_file_name(".hidden").is_ok());
    }

    #[test]
    fn path_like_names_are_rejected() {
        for name in ["", ".", "..", "../escaped.txt", "a/b.txt", "/tmp/escaped.txt"] {
            let err = local_file_name(name).unwrap_err();
            assert!(
                matches!(err, DriveError::UnsafeFileName(_)),
                "{name:?} was accepted"
            );
        }
    }

    #[test]
    fn default_endpoints_point_at_google() {
        let endpoints = DriveEndpoints::default();
        assert_eq!(endpoints.api_base, DRIVE_API_BASE);
        assert_eq!(endpoints.upload_base, UPLOAD_API_BASE);
    }
}
