//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! the monitor's internal statistics as a plain-text table.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");
    state.health_stats.record_http_request();

    let uptime_seconds = state.health_stats.get_uptime_seconds();
    let uptime_str = format_uptime(uptime_seconds);

    let table = state.health_stats.render_table();
    let upstream = state.upstream.base_url();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("OK\n\nUpstream: {upstream}\nUptime: {uptime_str}\n\n{table}"),
    )
}

fn format_uptime(uptime_seconds: u64) -> String {
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(90), "1.5 minutes");
        assert_eq!(format_uptime(2 * 3600 + 1800), "2.5 hours");
        assert_eq!(format_uptime(3 * 86400), "3.0 days");
    }
}
