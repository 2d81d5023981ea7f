//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Fetch pipeline (attempts, backoff waits)
//! - Ingestion (rows extracted, records inserted)
//! - Dispatch (sends per destination, delivery marks)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Fetch
// =============================================================================

/// Fetch attempts by result.
pub static FETCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crawler_fetch_attempts_total", "Total page fetch attempts"),
        &["result"], // "success", "status", "transport", "timeout"
    )
    .unwrap()
});

/// Backoff waits between fetch attempts.
pub static FETCH_BACKOFFS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "crawler_fetch_backoffs_total",
        "Total waits between fetch attempts",
    )
    .unwrap()
});

/// Duration of a complete fetch, retries included.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "crawler_fetch_duration_seconds",
            "Duration of page fetches including retries",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Ingestion
// =============================================================================

/// Listing rows seen by the extractor.
pub static ROWS_EXTRACTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crawler_rows_extracted_total", "Total listing rows parsed"),
        &["outcome"], // "valid", "dropped"
    )
    .unwrap()
});

/// Records written to the store.
pub static RECORDS_INSERTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "crawler_records_inserted_total",
            "Total records offered to the store",
        ),
        &["outcome"], // "inserted", "duplicate", "rejected"
    )
    .unwrap()
});

// =============================================================================
// Dispatch
// =============================================================================

/// Magnet sends by destination and result.
pub static DISPATCH_SENDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crawler_dispatch_sends_total", "Total magnet sends"),
        &["destination", "result"], // result: "success", "failure"
    )
    .unwrap()
});

/// Session handshakes performed by session-token destinations.
pub static DISPATCH_HANDSHAKES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "crawler_dispatch_handshakes_total",
            "Total session handshake retries",
        ),
        &["destination"],
    )
    .unwrap()
});

/// Delivery flags written back to the store.
pub static DELIVERY_MARKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("crawler_delivery_marks_total", "Total delivery state updates"),
        &["destination", "result"], // result: "marked", "missing", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Fetch
        Box::new(FETCH_ATTEMPTS.clone()),
        Box::new(FETCH_BACKOFFS.clone()),
        Box::new(FETCH_DURATION.clone()),
        // Ingestion
        Box::new(ROWS_EXTRACTED.clone()),
        Box::new(RECORDS_INSERTED.clone()),
        // Dispatch
        Box::new(DISPATCH_SENDS.clone()),
        Box::new(DISPATCH_HANDSHAKES.clone()),
        Box::new(DELIVERY_MARKS.clone()),
    ]
}
