//! Download task against a mocked Drive API.

mod common;

use std::fs;

use drive_tasks::tasks::{download_with, DownloadInput, DownloadOptions};
use drive_tasks::CancellationToken;
use mockito::Matcher;
use serde_json::json;
use tempfile::TempDir;

fn input_for(server: &mockito::ServerGuard, dir: &std::path::Path) -> DownloadInput {
    DownloadInput {
        service_account_key_json: common::service_account_key(server),
        file_query: Some("'folder-1' in parents".to_string()),
        destination_directory: dir.to_path_buf(),
        include_shared_drives: false,
    }
}

#[tokio::test]
async fn downloads_into_destination_named_after_remote_file() {
    let mut server = common::drive_server().await;
    let _token = common::mock_token(&mut server, 1).await;
    let _listing = common::mock_list(
        &mut server,
        json!([{"id": "d1", "name": "report.txt", "size": "11"}]),
    )
    .await;
    let media = server
        .mock("GET", "/drive/v3/files/d1")
        .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
        .with_status(200)
        .with_body("hello drive")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    // Longer existing content must be truncated, not partially overwritten.
    fs::write(dir.path().join("report.txt"), "stale content that is longer").unwrap();

    let result = download_with(
        &common::endpoints(&server),
        &input_for(&server, dir.path()),
        &DownloadOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(result.success);
    assert!(result.error_message.is_empty());
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.data[0].downloaded_file_id, "d1");
    assert_eq!(result.data[0].downloaded_filename, "report.txt");
    assert_eq!(
        fs::read_to_string(dir.path().join("report.txt")).unwrap(),
        "hello drive"
    );
    media.assert_async().await;
}

#[tokio::test]
async fn zero_matches_creates_no_files() {
    let mut server = common::drive_server().await;
    let _token = common::mock_token(&mut server, 1).await;
    let _listing = common::mock_list(&mut server, json!([])).await;

    let dir = TempDir::new().unwrap();

    let result = download_with(
        &common::endpoints(&server),
        &input_for(&server, dir.path()),
        &DownloadOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(result.success);
    assert!(result.data.is_empty());
    assert!(result.error_message.is_empty());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_destination_fails_before_any_request() {
    let mut server = common::drive_server().await;
    let token = common::mock_token(&mut server, 0).await;

    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("not-there");

    let err = download_with(
        &common::endpoints(&server),
        &input_for(&server, &missing),
        &DownloadOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(err.is_configuration());
    assert!(!missing.exists());
    token.assert_async().await;
}

#[tokio::test]
async fn destination_is_created_when_requested() {
    let mut server = common::drive_server().await;
    let _token = common::mock_token(&mut server, 1).await;
    let _listing = common::mock_list(&mut server, json!([])).await;

    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("incoming").join("today");

    let options = DownloadOptions {
        create_destination_folder: true,
        ..Default::default()
    };

    let result = download_with(
        &common::endpoints(&server),
        &input_for(&server, &nested),
        &options,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(result.success);
    assert!(nested.is_dir());
}

#[tokio::test]
async fn failures_accumulate_when_not_throwing() {
    let mut server = common::drive_server().await;
    let _token = common::mock_token(&mut server, 1).await;
    let _listing = common::mock_list(
        &mut server,
        json!([
            {"id": "doc1", "name": "Budget", "mimeType": "application/vnd.google-apps.spreadsheet"},
            {"id": "d2", "name": "notes.txt", "mimeType": "text/plain"}
        ]),
    )
    .await;
    let _native = server
        .mock("GET", "/drive/v3/files/doc1")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(common::api_error(
            403,
            "Only files with binary content can be downloaded. Use Export with Docs Editors files.",
        ))
        .create_async()
        .await;
    let _plain = server
        .mock("GET", "/drive/v3/files/d2")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("notes")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let options = DownloadOptions {
        throw_error_on_failure: false,
        ..Default::default()
    };

    let result = download_with(
        &common::endpoints(&server),
        &input_for(&server, dir.path()),
        &options,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(!result.success);
    assert_eq!(result.error_message.len(), 1);
    assert!(result.error_message[0].starts_with("Error downloading file: Budget. Error:"));
    // A failure does not hide later successes.
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.data[0].downloaded_filename, "notes.txt");
    assert!(dir.path().join("notes.txt").is_file());
}

#[tokio::test]
async fn first_failure_aborts_when_throwing() {
    let mut server = common::drive_server().await;
    let _token = common::mock_token(&mut server, 1).await;
    let _listing = common::mock_list(
        &mut server,
        json!([
            {"id": "gone", "name": "gone.txt"},
            {"id": "d2", "name": "notes.txt"}
        ]),
    )
    .await;
    let _gone = server
        .mock("GET", "/drive/v3/files/gone")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(common::api_error(404, "File not found: gone."))
        .create_async()
        .await;
    let untouched = server
        .mock("GET", "/drive/v3/files/d2")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("notes")
        .expect(0)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();

    let err = download_with(
        &common::endpoints(&server),
        &input_for(&server, dir.path()),
        &DownloadOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error downloading file: gone.txt. Error: API error (404): File not found: gone."
    );
    untouched.assert_async().await;
}

#[tokio::test]
async fn absolute_remote_name_is_not_written_outside_destination() {
    let outside = TempDir::new().unwrap();
    let escaped = outside.path().join("escaped.txt");

    let mut server = common::drive_server().await;
    let _token = common::mock_token(&mut server, 1).await;
    let _listing = common::mock_list(
        &mut server,
        json!([
            {"id": "d1", "name": escaped.to_string_lossy()},
            {"id": "d2", "name": "notes.txt"}
        ]),
    )
    .await;
    let hostile = server
        .mock("GET", "/drive/v3/files/d1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("overwritten")
        .expect(0)
        .create_async()
        .await;
    let _plain = server
        .mock("GET", "/drive/v3/files/d2")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("notes")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let options = DownloadOptions {
        throw_error_on_failure: false,
        ..Default::default()
    };

    let result = download_with(
        &common::endpoints(&server),
        &input_for(&server, dir.path()),
        &options,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(!escaped.exists());
    assert!(!result.success);
    assert_eq!(result.error_message.len(), 1);
    assert!(result.error_message[0].contains("escaped.txt"));
    assert_eq!(result.data.len(), 1);
    assert_eq!(result.data[0].downloaded_filename, "notes.txt");
    assert_eq!(
        fs::read_dir(dir.path()).unwrap().count(),
        1,
        "only notes.txt should be in the destination"
    );
    hostile.assert_async().await;
}

#[tokio::test]
async fn parent_traversal_name_fails_fast() {
    let mut server = common::drive_server().await;
    let _token = common::mock_token(&mut server, 1).await;
    let _listing = common::mock_list(
        &mut server,
        json!([{"id": "d1", "name": "../escaped.txt"}]),
    )
    .await;
    let hostile = server
        .mock("GET", "/drive/v3/files/d1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("overwritten")
        .expect(0)
        .create_async()
        .await;

    let root = TempDir::new().unwrap();
    let dest = root.path().join("dest");
    fs::create_dir(&dest).unwrap();

    let err = download_with(
        &common::endpoints(&server),
        &input_for(&server, &dest),
        &DownloadOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(err
        .to_string()
        .starts_with("Error downloading file: ../escaped.txt. Error: Unsafe file name"));
    assert!(!root.path().join("escaped.txt").exists());
    hostile.assert_async().await;
}
