//! Root endpoint handler for the landing page.
//!
//! This module provides the `/` endpoint handler that lists the available
//! endpoints together with the configured mosdns origin.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");
    state.health_stats.record_http_request();

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;
    let uptime_str = format!("{}h {}m {}s", hours, minutes, seconds);

    let upstream = state.upstream.base_url();
    let health_item = if state.config.enable_health.unwrap_or(true) {
        r#"<li><a href="/health">/health</a> - internal statistics (plain text)</li>"#
    } else {
        ""
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>mosdns monitor</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; line-height: 1.6; }}
        .container {{ max-width: 900px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 3px solid #007bff; padding-bottom: 15px; }}
        code {{ background: #e9ecef; padding: 2px 6px; border-radius: 4px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>mosdns monitor</h1>
        <p>Version {version} &middot; Uptime {uptime_str} &middot; Upstream <code>{upstream}</code></p>
        <h2>Endpoints</h2>
        <ul>
            <li><a href="/api/mosdns_status">/api/mosdns_status</a> - cache hit rates and process statistics (JSON)</li>
            <li><code>/plugins/&lt;path&gt;</code> - GET/POST relayed to <code>{upstream}/plugins/&lt;path&gt;</code></li>
            {health_item}
        </ul>
    </div>
</body>
</html>
"#
    ))
}
