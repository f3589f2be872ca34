//! Document generation handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use pdfsmith_core::{GenerationRequest, PipelineResult, RequestSource};

use crate::state::AppState;

/// Cache directives sent with every generated document.
pub const PDF_CACHE_CONTROL: &str = "must-revalidate, post-check=0, pre-check=0";

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub static DEGRADED_HEADER: HeaderName = HeaderName::from_static("x-pdf-degraded");

/// Error body for failed generations.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// `POST /pdf`: the body is the template text.
pub async fn generate_from_template(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Response {
    if body.is_empty() {
        return empty_body("template");
    }
    generate(&state, RequestSource::Template(body)).await
}

/// `POST /zippedpdf`: the body is a zip bundle carrying `template.tex`.
pub async fn generate_from_archive(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    if body.is_empty() {
        return empty_body("archive");
    }
    generate(&state, RequestSource::Archive(body.to_vec())).await
}

async fn generate(state: &AppState, source: RequestSource) -> Response {
    let request = GenerationRequest::new(source);
    let id = request.id();

    let result = match state.service().submit(request).await {
        Ok(result) => result,
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            return error_response(Some(id), status, e.to_string(), e.kind());
        }
    };

    match tokio::fs::read(&result.artifact).await {
        Ok(bytes) => pdf_response(id, &result, bytes),
        Err(e) => {
            error!(
                "Request {}: artifact {} could not be read: {}",
                id,
                result.artifact.display(),
                e
            );
            error_response(
                Some(id),
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read generated document: {}", e),
                "workspace_io",
            )
        }
    }
}

fn pdf_response(id: Uuid, result: &PipelineResult, bytes: Vec<u8>) -> Response {
    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(PDF_CACHE_CONTROL));
    insert_request_id(headers, id);

    if let Ok(value) = HeaderValue::from_str(&format!("inline; filename=\"{}\"", result.file_name))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    if result.is_degraded() {
        let mut kinds: Vec<&str> = Vec::new();
        for degradation in &result.degradations {
            if !kinds.contains(&degradation.kind()) {
                kinds.push(degradation.kind());
            }
        }
        warn!("Request {} served degraded document: {}", id, kinds.join(","));
        if let Ok(value) = HeaderValue::from_str(&kinds.join(",")) {
            headers.insert(DEGRADED_HEADER.clone(), value);
        }
    }

    response
}

fn empty_body(what: &str) -> Response {
    error_response(
        None,
        StatusCode::BAD_REQUEST,
        format!("Request body must contain the {}", what),
        "empty_body",
    )
}

fn error_response(id: Option<Uuid>, status: StatusCode, error: String, kind: &str) -> Response {
    let mut response = (
        status,
        Json(ErrorResponse {
            error,
            kind: kind.to_string(),
        }),
    )
        .into_response();
    if let Some(id) = id {
        insert_request_id(response.headers_mut(), id);
    }
    response
}

fn insert_request_id(headers: &mut axum::http::HeaderMap, id: Uuid) {
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        headers.insert(REQUEST_ID_HEADER.clone(), value);
    }
}
