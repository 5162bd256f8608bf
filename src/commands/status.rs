//! Status command implementation.
//!
//! Fetches one snapshot from mosdns and prints it, without starting the server.

use std::time::Instant;

use mosdns_monitor::cli::ConfigFormat;
use mosdns_monitor::config::Config;
use mosdns_monitor::exposition::parse_metrics_detailed;
use mosdns_monitor::upstream::UpstreamClient;

/// Fetches, parses and prints a status snapshot.
pub async fn command_status(
    format: ConfigFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = UpstreamClient::new(config.upstream_url())?
        .with_metrics_path(config.metrics_path())
        .with_timeouts(config.metrics_timeout(), config.proxy_timeout());

    let start = Instant::now();
    let text = match client.fetch_metrics().await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    let parsed = parse_metrics_detailed(&text);

    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&parsed.snapshot)?,
        ConfigFormat::Toml => toml::to_string_pretty(&parsed.snapshot)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&parsed.snapshot)?,
    };
    println!("{output}");

    eprintln!(
        "⏱️  {} in {:.2}ms: {} recognized lines, {} skipped",
        client.metrics_url(),
        start.elapsed().as_secs_f64() * 1000.0,
        parsed.recognized_lines,
        parsed.malformed.len()
    );
    for (line_number, e) in &parsed.malformed {
        eprintln!("   ├─ line {}: {}", line_number, e);
    }

    Ok(())
}
