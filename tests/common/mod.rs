//! Shared fixtures for the integration tests: a mock Drive server, a
//! service account key pointing at it, and endpoint wiring.

#![allow(dead_code)]

use drive_tasks::DriveEndpoints;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

/// Throwaway RSA key used only to sign test assertions.
pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_key.pem");

pub const TEST_TOKEN: &str = "test-access-token";

pub async fn drive_server() -> ServerGuard {
    Server::new_async().await
}

pub fn endpoints(server: &ServerGuard) -> DriveEndpoints {
    DriveEndpoints {
        api_base: format!("{}/drive/v3", server.url()),
        upload_base: format!("{}/upload/drive/v3", server.url()),
    }
}

/// Service account key JSON whose `token_uri` is the mock server.
pub fn service_account_key(server: &ServerGuard) -> String {
    json!({
        "type": "service_account",
        "project_id": "drive-tasks-test",
        "private_key_id": "0123456789abcdef",
        "private_key": TEST_PRIVATE_KEY,
        "client_email": "tasks@drive-tasks-test.iam.gserviceaccount.com",
        "client_id": "123456789012345678900",
        "token_uri": format!("{}/token", server.url()),
    })
    .to_string()
}

/// Token endpoint expected to be hit `times` times.
pub async fn mock_token(server: &mut ServerGuard, times: usize) -> Mock {
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": TEST_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600
            })
            .to_string(),
        )
        .expect(times)
        .create_async()
        .await
}

/// files.list answering with `files`.
pub async fn mock_list(server: &mut ServerGuard, files: serde_json::Value) -> Mock {
    server
        .mock("GET", "/drive/v3/files")
        .match_query(Matcher::Any)
        .match_header("authorization", format!("Bearer {TEST_TOKEN}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "files": files }).to_string())
        .create_async()
        .await
}

pub fn api_error(code: u16, message: &str) -> String {
    json!({ "error": { "code": code, "message": message } }).to_string()
}
