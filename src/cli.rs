//! CLI arguments and subcommands for mosdns-monitor.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, environment fallbacks and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Default, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug, Default)]
#[command(
    name = "mosdns-monitor",
    about = "Monitoring front-end for mosdns cache and process statistics",
    long_about = "Monitoring front-end for mosdns cache and process statistics.\n\n\
                  Polls the mosdns Prometheus endpoint, serves a JSON summary with per-cache \
                  hit rates and process resource usage, and relays /plugins/ control requests \
                  to the mosdns admin API.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long, env = "MOSDNS_MONITOR_PORT")]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Base URL of the mosdns admin API
    #[arg(short = 'u', long, env = "MOSDNS_ADMIN_URL")]
    pub upstream: Option<String>,

    /// Path of the mosdns metrics endpoint
    #[arg(long)]
    pub metrics_path: Option<String>,

    /// Timeout in seconds for metrics fetches
    #[arg(long)]
    pub metrics_timeout: Option<u64>,

    /// Timeout in seconds for proxied /plugins/ requests
    #[arg(long)]
    pub proxy_timeout: Option<u64>,

    /// Log level (defaults to the config file value, then info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Fetch and print one status snapshot, then exit
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: ConfigFormat,
    },
}
