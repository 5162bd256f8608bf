//! HTTP endpoint handlers for the monitor.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/`: Landing page
//! - `/api/mosdns_status`: JSON summary of mosdns caches and process stats
//! - `/plugins/{*subpath}`: Pass-through to the mosdns admin API
//! - `/health`: Internal statistics

pub mod health;
pub mod proxy;
pub mod root;
pub mod status;

use axum::{routing::get, Router};

use crate::state::SharedState;

// Re-export handlers
pub use health::health_handler;
pub use proxy::proxy_handler;
pub use root::root_handler;
pub use status::status_handler;

/// Path of the JSON status endpoint.
pub const STATUS_PATH: &str = "/api/mosdns_status";

/// Builds the HTTP router for the given state.
pub fn build_router(state: SharedState) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route(STATUS_PATH, get(status_handler))
        .route(
            "/plugins/{*subpath}",
            get(proxy_handler).post(proxy_handler),
        );

    if state.config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }

    app.with_state(state)
}
