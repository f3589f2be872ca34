//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by a real `PdfService` whose external tools and media fetcher are
//! mocks, so the HTTP surface can be tested without a TeX installation.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use zip::write::SimpleFileOptions;

use pdfsmith_core::{
    testing::{MockMediaFetcher, MockToolchain},
    Config, PdfService,
};
use pdfsmith_server::state::AppState;

/// Test fixture for API testing with mock dependencies.
///
/// Provides an in-process router with fully controllable mocks for:
/// - External tools (MockToolchain)
/// - Remote media (MockMediaFetcher)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_generate() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post_text("/pdf", "\\documentclass{article}").await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock toolchain - control tool outcomes
    pub toolchain: MockToolchain,
    /// Mock fetcher - control remote media
    pub fetcher: MockMediaFetcher,
    /// Service behind the router
    pub service: Arc<PdfService>,
    /// Workspace root
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON, or `Null` when it is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }

    /// Header value as a string, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test fixture after adjusting the default configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let toolchain = MockToolchain::new();
        let fetcher = MockMediaFetcher::new();

        let mut config = Config::default();
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        config.server.port = 0; // Not used for in-process testing
        config.paths.temporal = temp_dir.path().join("workspaces");
        config.cleanup.enabled = false;
        adjust(&mut config);

        let service = Arc::new(PdfService::new(
            &config,
            Arc::new(toolchain.clone()),
            Arc::new(fetcher.clone()),
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&service)));
        let router = pdfsmith_server::api::create_router(state);

        Self {
            router,
            toolchain,
            fetcher,
            service,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, Body::empty(), None).await
    }

    /// Send a POST request with a text body.
    pub async fn post_text(&self, path: &str, body: &str) -> TestResponse {
        self.request(
            "POST",
            path,
            Body::from(body.to_string()),
            Some("text/plain"),
        )
        .await
    }

    /// Send a POST request with a binary body.
    pub async fn post_bytes(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request(
            "POST",
            path,
            Body::from(body),
            Some("application/octet-stream"),
        )
        .await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Body,
        content_type: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            request_builder = request_builder.header("Content-Type", content_type);
        }
        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }
}

/// Build an in-memory zip bundle.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status,
            $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            String::from_utf8_lossy(&$response.bytes)
        );
    };
}
