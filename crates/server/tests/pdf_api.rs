//! API tests for the generation and admin endpoints.
//!
//! These run the real router and service against mock tools.

mod common;

use axum::http::StatusCode;
use serde_json::Value;

use common::{build_zip, TestFixture};
use pdfsmith_core::testing::{MockFailure, MockStep};

const TEMPLATE: &str =
    "\\documentclass{article}\\begin{document}Hello img:https://x/y.png}\\end{document}";

// =============================================================================
// POST /pdf
// =============================================================================

#[tokio::test]
async fn test_pdf_returns_document() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_text("/pdf", TEMPLATE).await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/pdf"));
    assert_eq!(
        response.header("cache-control"),
        Some("must-revalidate, post-check=0, pre-check=0")
    );
    assert!(response.header("x-request-id").is_some());
    assert!(response.header("x-pdf-degraded").is_none());
    assert!(response.bytes.starts_with(b"% optimized\n%PDF-1.4"));
    assert!(response.bytes.ends_with(b"% metadata restored\n"));
    assert_eq!(fixture.fetcher.requests().await, vec!["https://x/y.png"]);
}

#[tokio::test]
async fn test_pdf_empty_body_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_text("/pdf", "").await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "empty_body");
    assert!(fixture.toolchain.steps().await.is_empty());
}

#[tokio::test]
async fn test_pdf_typeset_failure_is_server_error() {
    let fixture = TestFixture::new().await;
    fixture
        .toolchain
        .set_failure(MockStep::Typeset, MockFailure::Exit(1))
        .await;

    let response = fixture.post_text("/pdf", "\\broken").await;

    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["kind"], "typeset_failed");
    assert!(body["error"].is_string());
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_pdf_degraded_header_lists_kinds() {
    let fixture = TestFixture::new().await;
    fixture.fetcher.fail_url("https://x/y.png").await;
    fixture
        .toolchain
        .set_failure(MockStep::Optimize, MockFailure::Timeout)
        .await;

    let response = fixture.post_text("/pdf", TEMPLATE).await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(
        response.header("x-pdf-degraded"),
        Some("media_fetch_failed,optimization_degraded")
    );
    assert!(response.bytes.starts_with(b"%PDF-1.4\n% mock typeset\n"));
}

// =============================================================================
// POST /zippedpdf
// =============================================================================

#[tokio::test]
async fn test_zippedpdf_returns_document() {
    let fixture = TestFixture::new().await;
    let archive = build_zip(&[
        ("template.tex", TEMPLATE.as_bytes()),
        ("figures/logo.png", b"logo"),
    ]);

    let response = fixture.post_bytes("/zippedpdf", archive).await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/pdf"));
    assert!(response.bytes.ends_with(b"% metadata restored\n"));
}

#[tokio::test]
async fn test_zippedpdf_without_template_is_bad_request() {
    let fixture = TestFixture::new().await;
    let archive = build_zip(&[("main.tex", b"x")]);

    let response = fixture.post_bytes("/zippedpdf", archive).await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "archive_extraction");
}

#[tokio::test]
async fn test_zippedpdf_garbage_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post_bytes("/zippedpdf", b"definitely not a zip".to_vec())
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "archive_extraction");
}

#[tokio::test]
async fn test_zippedpdf_empty_body_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture.post_bytes("/zippedpdf", Vec::new()).await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["kind"], "empty_body");
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.json()["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::with_config(|config| {
        config.paths.pdflatex = "/opt/texlive/bin/pdflatex".into();
        config.generation.admission_capacity = 4;
    })
    .await;

    let response = fixture.get("/api/v1/config").await;

    assert_status!(response, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["paths"]["pdflatex"], "pdflatex");
    assert_eq!(body["generation"]["admission_capacity"], 4);
    assert!(!String::from_utf8_lossy(&response.bytes).contains("/opt/texlive"));
}

#[tokio::test]
async fn test_admission_status_when_idle() {
    let fixture = TestFixture::with_config(|config| {
        config.generation.admission_capacity = 3;
    })
    .await;

    let response = fixture.get("/api/v1/admission").await;

    assert_status!(response, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["capacity"], 3);
    assert_eq!(body["admitted"], Value::Array(vec![]));
    assert_eq!(body["waiting"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_metrics_exposition() {
    let fixture = TestFixture::new().await;
    fixture.post_text("/pdf", "plain").await;

    let response = fixture.get("/metrics").await;

    assert_status!(response, StatusCode::OK);
    let text = String::from_utf8_lossy(&response.bytes);
    assert!(text.contains("pdfsmith_http_requests_total"));
    assert!(text.contains("pdfsmith_generations_total"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/nope").await;

    assert_status!(response, StatusCode::NOT_FOUND);
}
