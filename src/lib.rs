//! drive_tasks - Google Drive file tasks for workflow automation.
//!
//! Four independent tasks, each authenticating with a service account key:
//! - List files matching a Drive query
//! - Upload local files matching a filemask
//! - Download files matching a Drive query
//! - Delete files matching a Drive query
//!
//! Every task runs through the same pipeline (see [`pipeline`]) and returns
//! a result record shaped for the calling workflow engine.
//!
//! # Example
//!
//! ```no_run
//! use drive_tasks::tasks::{upload, UploadInput, UploadOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let input = UploadInput {
//!         source_directory: "/data/outgoing".into(),
//!         file_mask: Some("*.pdf".to_string()),
//!         target_folder_id: Some("folder-id".to_string()),
//!         service_account_key_json: "service-account.json".to_string(),
//!         include_shared_drives: false,
//!     };
//!
//!     let result = upload(&input, &UploadOptions::default(), &CancellationToken::new()).await?;
//!     for file in result.data {
//!         println!("{} {}", file.uploaded_file_id, file.uploaded_file_name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod credential;
pub mod error;
pub mod filemask;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod tasks;

// Re-exports for convenience
pub use error::{DriveError, Result};
pub use pipeline::FailurePolicy;
pub use session::DriveEndpoints;
pub use tokio_util::sync::CancellationToken;
