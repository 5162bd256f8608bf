//! Configuration management for mosdns-monitor.
//!
//! This module handles loading, merging, and validating configuration from files,
//! environment variables and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use crate::upstream::{DEFAULT_METRICS_PATH, DEFAULT_UPSTREAM_URL};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_METRICS_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 10;

/// Configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Upstream mosdns admin API
    #[serde(alias = "upstream-url", alias = "mosdns_admin_url")]
    pub upstream_url: Option<String>,
    #[serde(alias = "metrics-path")]
    pub metrics_path: Option<String>,
    #[serde(alias = "metrics-timeout-secs")]
    pub metrics_timeout_secs: Option<u64>,
    #[serde(alias = "proxy-timeout-secs")]
    pub proxy_timeout_secs: Option<u64>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            upstream_url: Some(DEFAULT_UPSTREAM_URL.to_string()),
            metrics_path: Some(DEFAULT_METRICS_PATH.to_string()),
            metrics_timeout_secs: Some(DEFAULT_METRICS_TIMEOUT_SECS),
            proxy_timeout_secs: Some(DEFAULT_PROXY_TIMEOUT_SECS),
            enable_health: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn upstream_url(&self) -> &str {
        self.upstream_url.as_deref().unwrap_or(DEFAULT_UPSTREAM_URL)
    }

    pub fn metrics_path(&self) -> &str {
        self.metrics_path.as_deref().unwrap_or(DEFAULT_METRICS_PATH)
    }

    pub fn metrics_timeout(&self) -> Duration {
        Duration::from_secs(
            self.metrics_timeout_secs
                .unwrap_or(DEFAULT_METRICS_TIMEOUT_SECS),
        )
    }

    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs.unwrap_or(DEFAULT_PROXY_TIMEOUT_SECS))
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Upstream URL must be an absolute http(s) origin
    let upstream = cfg.upstream_url();
    match Url::parse(upstream) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            if url.host_str().is_none() {
                return Err(format!("upstream_url '{}' has no host", upstream).into());
            }
        }
        Ok(url) => {
            return Err(format!(
                "upstream_url '{}' has unsupported scheme '{}', expected http or https",
                upstream,
                url.scheme()
            )
            .into());
        }
        Err(e) => {
            return Err(format!("upstream_url '{}' is not a valid URL: {}", upstream, e).into());
        }
    }

    if !cfg.metrics_path().starts_with('/') {
        return Err(format!(
            "metrics_path '{}' must start with '/'",
            cfg.metrics_path()
        )
        .into());
    }

    if cfg.metrics_timeout_secs == Some(0) {
        return Err("metrics_timeout_secs must be greater than 0".into());
    }
    if cfg.proxy_timeout_secs == Some(0) {
        return Err("proxy_timeout_secs must be greater than 0".into());
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

/// Checks that a TLS file exists, is readable and is not empty.
fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(format!("TLS {} file not found: {}", what, path).into());
    }
    match fs::metadata(p) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Err(e) => {
            Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into())
        }
        Ok(_) => Ok(()),
    }
}

/// Resolves configuration from CLI args, environment, config file, and defaults.
/// This enforces precedence: CLI/env (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    // Upstream settings
    if let Some(upstream) = &args.upstream {
        config.upstream_url = Some(upstream.trim_end_matches('/').to_string());
    }
    if let Some(path) = &args.metrics_path {
        config.metrics_path = Some(path.clone());
    }
    if let Some(secs) = args.metrics_timeout {
        config.metrics_timeout_secs = Some(secs);
    }
    if let Some(secs) = args.proxy_timeout {
        config.proxy_timeout_secs = Some(secs);
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        // An explicitly requested file must exist
        if !p.exists() {
            return Err(format!("Config file not found: {}", p.display()).into());
        }
        PathBuf::from(p)
    } else {
        let defaults = [
            "/etc/mosdns-monitor/config.yaml",
            "/etc/mosdns-monitor/config.yml",
            "/etc/mosdns-monitor/config.json",
            "./mosdns-monitor.yaml",
            "./mosdns-monitor.yml",
            "./mosdns-monitor.json",
        ];

        match defaults.iter().find(|p| Path::new(p).exists()) {
            Some(found) => PathBuf::from(found),
            None => return Ok(Config::default()),
        }
    };

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}
