//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Admission (slot occupancy, wait list, wait time)
//! - Generation (outcomes, durations, typesetting passes, degradations)
//! - Media fetching and workspace sweeping

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Admission Metrics
// =============================================================================

/// Requests currently holding an admission slot.
pub static ADMISSION_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pdfsmith_admission_active",
        "Requests currently holding an admission slot",
    )
    .unwrap()
});

/// Requests currently on the wait list.
pub static ADMISSION_WAITING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pdfsmith_admission_waiting",
        "Requests waiting for an admission slot",
    )
    .unwrap()
});

/// Time spent on the wait list before promotion.
pub static ADMISSION_WAIT: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "pdfsmith_admission_wait_seconds",
            "Time spent waiting for an admission slot",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .unwrap()
});

/// Admissions by route.
pub static ADMISSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfsmith_admissions_total", "Total admissions"),
        &["route"], // "direct", "promoted"
    )
    .unwrap()
});

// =============================================================================
// Generation Metrics
// =============================================================================

/// Generation outcomes.
pub static GENERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfsmith_generations_total", "Total generation requests"),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// End-to-end generation duration, admission wait excluded.
pub static GENERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pdfsmith_generation_duration_seconds",
            "Duration of the generation pipeline",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

/// Typesetting passes by result.
pub static TYPESET_PASSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfsmith_typeset_passes_total", "Total typesetting passes"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Non-fatal degradations by kind.
pub static DEGRADATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pdfsmith_degradations_total",
            "Total non-fatal degradations attached to successful results",
        ),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Media / Workspace Metrics
// =============================================================================

/// Media fetches by result.
pub static MEDIA_FETCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfsmith_media_fetches_total", "Total remote media fetches"),
        &["result"], // "ok", "failed"
    )
    .unwrap()
});

/// Workspaces deleted by the sweeper.
pub static WORKSPACES_SWEPT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pdfsmith_workspaces_swept_total",
        "Total workspaces removed by the periodic sweep",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Admission
        Box::new(ADMISSION_ACTIVE.clone()),
        Box::new(ADMISSION_WAITING.clone()),
        Box::new(ADMISSION_WAIT.clone()),
        Box::new(ADMISSIONS_TOTAL.clone()),
        // Generation
        Box::new(GENERATIONS_TOTAL.clone()),
        Box::new(GENERATION_DURATION.clone()),
        Box::new(TYPESET_PASSES.clone()),
        Box::new(DEGRADATIONS_TOTAL.clone()),
        // Media / workspace
        Box::new(MEDIA_FETCHES_TOTAL.clone()),
        Box::new(WORKSPACES_SWEPT.clone()),
    ]
}
