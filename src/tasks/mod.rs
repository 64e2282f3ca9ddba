//! The four Drive tasks.
//!
//! Each task takes an input record (and, for transfers, an options record)
//! deserializable from the host engine's JSON, plus a cancellation token,
//! and returns its result record. The `*_with` variants accept explicit
//! [`DriveEndpoints`](crate::session::DriveEndpoints).

pub mod delete;
pub mod download;
pub mod list;
pub mod upload;

pub use delete::{delete, delete_with, DeleteInput};
pub use download::{download, download_with, DownloadInput, DownloadOptions};
pub use list::{list, list_with, ListInput};
pub use upload::{upload, upload_with, UploadInput, UploadOptions};

fn default_true() -> bool {
    true
}
