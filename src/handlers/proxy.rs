//! Control proxy handler.
//!
//! Requests to `/plugins/<subpath>` are forwarded to the same path on the
//! mosdns admin API. Successful responses are relayed byte for byte with
//! their status and content type; any failure becomes a plain-text 502.

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;
use crate::upstream::{ProxiedResponse, UpstreamError, DEFAULT_CONTENT_TYPE};

/// Handler for GET and POST /plugins/{*subpath}.
#[instrument(skip(state))]
pub async fn proxy_handler(
    State(state): State<SharedState>,
    method: Method,
    Path(subpath): Path<String>,
) -> Response {
    state.health_stats.record_http_request();
    debug!(
        "Proxying {} request to -> {}",
        method,
        state.upstream.plugins_url(&subpath)
    );

    let start = Instant::now();
    let result = state.upstream.forward(method, &subpath).await;
    state
        .health_stats
        .record_proxy_request(start.elapsed().as_secs_f64() * 1000.0);

    match result {
        Ok(upstream) => relay(upstream),
        Err(e) => {
            error!("Proxy request to mosdns failed: {}", e);
            state.health_stats.record_proxy_failure();
            bad_gateway(&e)
        }
    }
}

fn relay(upstream: ProxiedResponse) -> Response {
    (
        upstream.status,
        [(CONTENT_TYPE, upstream.content_type)],
        upstream.body,
    )
        .into_response()
}

fn bad_gateway(e: &UpstreamError) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        [(CONTENT_TYPE, DEFAULT_CONTENT_TYPE)],
        format!("mosdns request failed: {}", e),
    )
        .into_response()
}
