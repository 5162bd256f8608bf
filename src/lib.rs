//! mosdns monitor library
//!
//! This library turns the Prometheus exposition text of a mosdns DNS
//! resolver into a compact status summary and relays control requests to
//! its admin API. The binary wires these pieces into an axum server; they
//! are exposed here so they can be embedded or tested on their own.
//!
//! # Features
//!
//! - **Exposition parsing**: per-tag cache counters with hit and lazy-hit rates,
//!   plus process and Go runtime statistics in human-readable units
//! - **Upstream client**: bounded-timeout fetches with errors that name the URL
//! - **Control proxy**: byte-transparent relay of `/plugins/` requests
//!
//! # Usage
//!
//! ```rust
//! use mosdns_monitor::parse_metrics;
//!
//! let text = "process_resident_memory_bytes 104857600\n\
//!             mosdns_cache_query_total{tag=\"lazy\"} 0\n";
//! let snapshot = parse_metrics(text);
//!
//! assert_eq!(snapshot.system.resident_memory.as_deref(), Some("100.00 MB"));
//! assert_eq!(snapshot.caches["lazy"].hit_rate, "0.00%");
//! ```

pub mod cli;
pub mod config;
pub mod exposition;
pub mod handlers;
pub mod health_stats;
pub mod state;
pub mod upstream;

// Re-export main types for convenience
pub use exposition::{
    parse_metrics, parse_metrics_detailed, CacheStats, MalformedLine, StatusSnapshot, SystemStats,
};
pub use handlers::build_router;
pub use state::{AppState, SharedState};
pub use upstream::{ProxiedResponse, UpstreamClient, UpstreamError};
