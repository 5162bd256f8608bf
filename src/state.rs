//! Application state shared by the HTTP handlers.
//!
//! Everything here is read-only after startup apart from the observability
//! counters in [`HealthStats`]. Snapshots are never stored: each status
//! request fetches and parses afresh.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::health_stats::HealthStats;
use crate::upstream::UpstreamClient;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: UpstreamClient,
    pub health_stats: Arc<HealthStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Builds the state from a validated configuration.
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(config.upstream_url())?
            .with_metrics_path(config.metrics_path())
            .with_timeouts(config.metrics_timeout(), config.proxy_timeout());

        Ok(Self {
            config: Arc::new(config),
            upstream,
            health_stats: Arc::new(HealthStats::new()),
            start_time: Instant::now(),
        })
    }
}
