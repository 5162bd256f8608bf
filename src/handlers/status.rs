//! Status endpoint handler.
//!
//! This module provides the `/api/mosdns_status` endpoint handler that fetches
//! the mosdns exposition text, parses it and returns the JSON summary.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::exposition::parse_metrics_detailed;
use crate::state::SharedState;
use crate::upstream::UpstreamError;

/// Error type for status endpoint failures.
#[derive(Debug)]
pub enum StatusError {
    Upstream(UpstreamError),
}

impl IntoResponse for StatusError {
    fn into_response(self) -> axum::response::Response {
        match self {
            StatusError::Upstream(e) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": format!("cannot reach mosdns metrics endpoint: {}", e)
                })),
            )
                .into_response(),
        }
    }
}

/// Handler for the /api/mosdns_status endpoint.
#[instrument(skip(state))]
pub async fn status_handler(State(state): State<SharedState>) -> Result<impl IntoResponse, StatusError> {
    debug!("Processing /api/mosdns_status request");
    state.health_stats.record_http_request();
    state.health_stats.record_status_request();

    let fetch_start = Instant::now();
    let text = state.upstream.fetch_metrics().await.map_err(|e| {
        error!("Metrics fetch failed: {}", e);
        state.health_stats.record_fetch_failure();
        StatusError::Upstream(e)
    })?;
    let fetch_ms = fetch_start.elapsed().as_secs_f64() * 1000.0;

    let parse_start = Instant::now();
    let parsed = parse_metrics_detailed(&text);
    let parse_ms = parse_start.elapsed().as_secs_f64() * 1000.0;

    state.health_stats.record_fetch(
        fetch_ms,
        parse_ms,
        parsed.snapshot.caches.len() as u64,
        parsed.malformed.len() as u64,
    );

    debug!(
        "Parsed {} bytes: {} recognized lines, {} skipped, {} cache tags ({:.2}ms fetch, {:.2}ms parse)",
        text.len(),
        parsed.recognized_lines,
        parsed.malformed.len(),
        parsed.snapshot.caches.len(),
        fetch_ms,
        parse_ms
    );

    Ok(Json(parsed.snapshot))
}
