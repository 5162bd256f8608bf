//! CLI command implementations for mosdns-monitor.
//!
//! This module provides implementations for all CLI subcommands:
//! - `config`: Configuration file generation
//! - `status`: One-shot status snapshot

pub mod config;
pub mod status;

// Re-export command functions
pub use config::command_config;
pub use status::command_status;
