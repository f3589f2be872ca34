//! Admission controller inspection.

use axum::{extract::State, http::StatusCode, Json};
use pdfsmith_core::AdmissionStatus;
use std::sync::Arc;

use super::pdf::ErrorResponse;
use crate::state::AppState;

/// Capacity, admitted request ids and the wait list (head first).
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AdmissionStatus>, (StatusCode, Json<ErrorResponse>)> {
    state
        .service()
        .admission()
        .status()
        .await
        .map(Json)
        .map_err(|e| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.to_string(),
                    kind: "admission_closed".to_string(),
                }),
            )
        })
}
