//! Parsing of the mosdns Prometheus exposition text.
//!
//! mosdns exposes far more series than the dashboard shows. Only a fixed
//! vocabulary is recognized here: per-tag `mosdns_cache_*` counters plus a
//! handful of process and Go runtime gauges. Every other line is dropped.
//!
//! Parsing is a single pass that classifies each line into a [`MetricLine`]
//! and feeds it to a [`SnapshotBuilder`]. Hit rates and human-readable units
//! are derived only in [`SnapshotBuilder::finish`], once every line has been
//! seen, so a tag's rates always reflect its final counters.
//!
//! ```rust
//! use mosdns_monitor::exposition::parse_metrics;
//!
//! let text = "mosdns_cache_query_total{tag=\"main\"} 200\n\
//!             mosdns_cache_hit_total{tag=\"main\"} 150\n";
//! let snapshot = parse_metrics(text);
//! assert_eq!(snapshot.caches["main"].hit_rate, "75.00%");
//! assert_eq!(snapshot.system.runtime_version, "N/A");
//! ```

use chrono::{Local, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Runtime version reported when no `go_info` line is present.
pub const UNKNOWN_RUNTIME_VERSION: &str = "N/A";

/// Counter names used for rate derivation.
pub const QUERY_TOTAL: &str = "query_total";
pub const HIT_TOTAL: &str = "hit_total";
pub const LAZY_HIT_TOTAL: &str = "lazy_hit_total";

const HIT_RATE_KEY: &str = "hit_rate";
const LAZY_HIT_RATE_KEY: &str = "lazy_hit_rate";
const ZERO_RATE: &str = "0.00%";
const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static CACHE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^mosdns_cache_(\w+)\{tag="([^"]+)"\}\s+([\d.eE+-]+)"#).expect("valid cache regex")
});

/// Single-value system series, tried in this order after the cache pattern.
static SCALAR_PATTERNS: Lazy<Vec<(MetricKind, Regex)>> = Lazy::new(|| {
    [
        (MetricKind::StartTime, r"^process_start_time_seconds\s+([\d.eE+-]+)"),
        (MetricKind::CpuSeconds, r"^process_cpu_seconds_total\s+([\d.eE+-]+)"),
        (MetricKind::ResidentMemory, r"^process_resident_memory_bytes\s+([\d.eE+-]+)"),
        (MetricKind::HeapIdleMemory, r"^go_memstats_heap_idle_bytes\s+([\d.eE+-]+)"),
        (MetricKind::Threads, r"^go_threads\s+(\d+)"),
        (MetricKind::OpenFds, r"^process_open_fds\s+(\d+)"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("valid scalar regex")))
    .collect()
});

// Not anchored: the label may appear anywhere in the line.
static GO_INFO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"go_info\{version="([^"]+)"\}"#).expect("valid go_info regex"));

/// The kinds of exposition lines this module understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Cache,
    StartTime,
    CpuSeconds,
    ResidentMemory,
    HeapIdleMemory,
    Threads,
    OpenFds,
    RuntimeVersion,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cache => "mosdns_cache",
            MetricKind::StartTime => "process_start_time_seconds",
            MetricKind::CpuSeconds => "process_cpu_seconds_total",
            MetricKind::ResidentMemory => "process_resident_memory_bytes",
            MetricKind::HeapIdleMemory => "go_memstats_heap_idle_bytes",
            MetricKind::Threads => "go_threads",
            MetricKind::OpenFds => "process_open_fds",
            MetricKind::RuntimeVersion => "go_info",
        }
    }

    /// Builds the line variant for a scalar kind from its captured value.
    fn scalar(self, raw: &str) -> Option<MetricLine> {
        let line = match self {
            MetricKind::StartTime => MetricLine::StartTime(raw.parse().ok()?),
            MetricKind::CpuSeconds => MetricLine::CpuSeconds(raw.parse().ok()?),
            MetricKind::ResidentMemory => MetricLine::ResidentMemory(raw.parse().ok()?),
            MetricKind::HeapIdleMemory => MetricLine::HeapIdleMemory(raw.parse().ok()?),
            MetricKind::Threads => MetricLine::Threads(raw.parse().ok()?),
            MetricKind::OpenFds => MetricLine::OpenFds(raw.parse().ok()?),
            MetricKind::Cache | MetricKind::RuntimeVersion => return None,
        };
        Some(line)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line that matched a known pattern but whose numeric field did not parse.
///
/// Never fatal: the parser skips the line and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse {kind} value {value:?}")]
pub struct MalformedLine {
    pub kind: MetricKind,
    pub value: String,
}

impl MalformedLine {
    fn new(kind: MetricKind, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// One recognized exposition line.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricLine {
    Cache {
        metric: String,
        tag: String,
        value: f64,
    },
    StartTime(f64),
    CpuSeconds(f64),
    ResidentMemory(f64),
    HeapIdleMemory(f64),
    Threads(u64),
    OpenFds(u64),
    RuntimeVersion(String),
}

/// Classifies a single exposition line.
///
/// Patterns are tried in a fixed priority order and the first match wins.
/// Returns `Ok(None)` for lines outside the recognized vocabulary.
pub fn classify_line(line: &str) -> Result<Option<MetricLine>, MalformedLine> {
    if let Some(caps) = CACHE_RE.captures(line) {
        let raw = &caps[3];
        let value = raw
            .parse::<f64>()
            .map_err(|_| MalformedLine::new(MetricKind::Cache, raw))?;
        return Ok(Some(MetricLine::Cache {
            metric: caps[1].to_string(),
            tag: caps[2].to_string(),
            value,
        }));
    }

    for (kind, regex) in SCALAR_PATTERNS.iter() {
        if let Some(caps) = regex.captures(line) {
            let raw = &caps[1];
            return kind
                .scalar(raw)
                .map(Some)
                .ok_or_else(|| MalformedLine::new(*kind, raw));
        }
    }

    if let Some(caps) = GO_INFO_RE.captures(line) {
        return Ok(Some(MetricLine::RuntimeVersion(caps[1].to_string())));
    }

    Ok(None)
}

/// Counters and derived rates for one cache tag.
///
/// Every `mosdns_cache_<name>` series seen for the tag is kept in `counters`;
/// only the query/hit/lazy-hit totals feed the derived rates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    #[serde(flatten)]
    pub counters: BTreeMap<String, f64>,
    pub hit_rate: String,
    pub lazy_hit_rate: String,
}

impl CacheStats {
    fn derive(mut counters: BTreeMap<String, f64>) -> Self {
        let query_total = counters.get(QUERY_TOTAL).copied().unwrap_or(0.0);
        let hit_total = counters.get(HIT_TOTAL).copied().unwrap_or(0.0);
        let lazy_hit_total = counters.get(LAZY_HIT_TOTAL).copied().unwrap_or(0.0);

        // Derived fields take precedence over same-named upstream series.
        counters.remove(HIT_RATE_KEY);
        counters.remove(LAZY_HIT_RATE_KEY);

        Self {
            counters,
            hit_rate: format_rate(hit_total, query_total),
            lazy_hit_rate: format_rate(lazy_hit_total, query_total),
        }
    }

    /// Returns a captured counter by metric name.
    pub fn counter(&self, metric: &str) -> Option<f64> {
        self.counters.get(metric).copied()
    }
}

/// Process and runtime statistics, formatted for display.
///
/// Absent source series stay absent; only `runtime_version` has a default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heap_idle_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_fds: Option<u64>,
    pub runtime_version: String,
}

impl Default for SystemStats {
    fn default() -> Self {
        Self {
            start_time: None,
            cpu_time: None,
            resident_memory: None,
            heap_idle_memory: None,
            threads: None,
            open_fds: None,
            runtime_version: UNKNOWN_RUNTIME_VERSION.to_string(),
        }
    }
}

/// The structured summary served by the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub caches: BTreeMap<String, CacheStats>,
    pub system: SystemStats,
}

/// Raw system values as they appear in the exposition text.
#[derive(Debug, Clone, Default, PartialEq)]
struct RawSystemStats {
    start_time_seconds: Option<f64>,
    cpu_seconds: Option<f64>,
    resident_memory_bytes: Option<f64>,
    heap_idle_bytes: Option<f64>,
    threads: Option<u64>,
    open_fds: Option<u64>,
    runtime_version: Option<String>,
}

impl RawSystemStats {
    fn format(self) -> SystemStats {
        SystemStats {
            start_time: self.start_time_seconds.map(format_start_time),
            cpu_time: self.cpu_seconds.map(|secs| format!("{:.2} s", secs)),
            resident_memory: self.resident_memory_bytes.map(format_mebibytes),
            heap_idle_memory: self.heap_idle_bytes.map(format_mebibytes),
            threads: self.threads,
            open_fds: self.open_fds,
            runtime_version: self
                .runtime_version
                .unwrap_or_else(|| UNKNOWN_RUNTIME_VERSION.to_string()),
        }
    }
}

/// Accumulates classified lines; derivation is deferred to [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    caches: BTreeMap<String, BTreeMap<String, f64>>,
    system: RawSystemStats,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one line. A repeated series overwrites the earlier value.
    pub fn accept(&mut self, line: MetricLine) {
        match line {
            MetricLine::Cache { metric, tag, value } => {
                self.caches.entry(tag).or_default().insert(metric, value);
            }
            MetricLine::StartTime(v) => self.system.start_time_seconds = Some(v),
            MetricLine::CpuSeconds(v) => self.system.cpu_seconds = Some(v),
            MetricLine::ResidentMemory(v) => self.system.resident_memory_bytes = Some(v),
            MetricLine::HeapIdleMemory(v) => self.system.heap_idle_bytes = Some(v),
            MetricLine::Threads(v) => self.system.threads = Some(v),
            MetricLine::OpenFds(v) => self.system.open_fds = Some(v),
            MetricLine::RuntimeVersion(v) => self.system.runtime_version = Some(v),
        }
    }

    /// Number of distinct cache tags seen so far.
    pub fn cache_tags(&self) -> usize {
        self.caches.len()
    }

    pub fn finish(self) -> StatusSnapshot {
        let caches = self
            .caches
            .into_iter()
            .map(|(tag, counters)| (tag, CacheStats::derive(counters)))
            .collect();

        StatusSnapshot {
            caches,
            system: self.system.format(),
        }
    }
}

/// A snapshot together with what the parser saw while building it.
#[derive(Debug, Clone)]
pub struct ParsedMetrics {
    pub snapshot: StatusSnapshot,
    /// Lines that matched a known pattern and were accepted.
    pub recognized_lines: usize,
    /// Skipped lines as (1-based line number, error).
    pub malformed: Vec<(usize, MalformedLine)>,
}

/// Parses exposition text into a [`StatusSnapshot`].
pub fn parse_metrics(text: &str) -> StatusSnapshot {
    parse_metrics_detailed(text).snapshot
}

/// Parses exposition text and reports recognized and skipped lines.
pub fn parse_metrics_detailed(text: &str) -> ParsedMetrics {
    let mut builder = SnapshotBuilder::new();
    let mut recognized_lines = 0;
    let mut malformed = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        match classify_line(line) {
            Ok(Some(metric)) => {
                builder.accept(metric);
                recognized_lines += 1;
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Skipping exposition line {}: {}", idx + 1, e);
                malformed.push((idx + 1, e));
            }
        }
    }

    ParsedMetrics {
        snapshot: builder.finish(),
        recognized_lines,
        malformed,
    }
}

/// Formats `part / total` as a percentage with two decimals.
pub fn format_rate(part: f64, total: f64) -> String {
    if total > 0.0 {
        format!("{:.2}%", part / total * 100.0)
    } else {
        ZERO_RATE.to_string()
    }
}

/// Formats a byte count as mebibytes, e.g. `"100.00 MB"`.
pub fn format_mebibytes(bytes: f64) -> String {
    format!("{:.2} MB", bytes / BYTES_PER_MIB)
}

/// Formats unix seconds as local time. Out-of-range values fall back to the raw number.
pub fn format_start_time(unix_seconds: f64) -> String {
    let whole = unix_seconds.trunc();
    let nanos = ((unix_seconds - whole) * 1e9) as u32;
    Local
        .timestamp_opt(whole as i64, nanos)
        .single()
        .map(|dt| dt.format(START_TIME_FORMAT).to_string())
        .unwrap_or_else(|| format!("{}", unix_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_cache_line() {
        let line = r#"mosdns_cache_query_total{tag="cache_all"} 1234"#;
        assert_eq!(
            classify_line(line).unwrap(),
            Some(MetricLine::Cache {
                metric: "query_total".into(),
                tag: "cache_all".into(),
                value: 1234.0,
            })
        );
    }

    #[test]
    fn test_classify_scientific_notation() {
        let line = "process_resident_memory_bytes 1.048576e+08";
        assert_eq!(
            classify_line(line).unwrap(),
            Some(MetricLine::ResidentMemory(104857600.0))
        );
    }

    #[test]
    fn test_classify_integer_series() {
        assert_eq!(
            classify_line("go_threads 14").unwrap(),
            Some(MetricLine::Threads(14))
        );
        assert_eq!(
            classify_line("process_open_fds 27").unwrap(),
            Some(MetricLine::OpenFds(27))
        );
    }

    #[test]
    fn test_go_info_matches_anywhere() {
        let line = r#"go_info{version="go1.22.5"} 1"#;
        assert_eq!(
            classify_line(line).unwrap(),
            Some(MetricLine::RuntimeVersion("go1.22.5".into()))
        );

        let prefixed = r#"xgo_info{version="go1.21.0"} 1"#;
        assert_eq!(
            classify_line(prefixed).unwrap(),
            Some(MetricLine::RuntimeVersion("go1.21.0".into()))
        );
    }

    #[test]
    fn test_scalar_patterns_are_anchored() {
        assert_eq!(
            classify_line("# HELP process_open_fds Number of open file descriptors.").unwrap(),
            None
        );
        assert_eq!(
            classify_line("# TYPE go_threads gauge").unwrap(),
            None
        );
        assert_eq!(classify_line("my_go_threads 3").unwrap(), None);
    }

    #[test]
    fn test_cache_line_with_extra_labels_ignored() {
        let line = r#"mosdns_cache_query_total{tag="a",zone="b"} 5"#;
        assert_eq!(classify_line(line).unwrap(), None);
    }

    #[test]
    fn test_malformed_value_reports_kind() {
        let err = classify_line("process_cpu_seconds_total 1.2.3").unwrap_err();
        assert_eq!(err.kind, MetricKind::CpuSeconds);
        assert_eq!(err.value, "1.2.3");

        let err = classify_line(r#"mosdns_cache_hit_total{tag="x"} e+"#).unwrap_err();
        assert_eq!(err.kind, MetricKind::Cache);
    }

    #[test]
    fn test_thread_count_overflow_is_malformed() {
        let err = classify_line("go_threads 99999999999999999999999").unwrap_err();
        assert_eq!(err.kind, MetricKind::Threads);
    }

    #[test]
    fn test_later_line_overwrites_earlier() {
        let mut builder = SnapshotBuilder::new();
        builder.accept(MetricLine::Threads(3));
        builder.accept(MetricLine::Threads(9));
        let snapshot = builder.finish();
        assert_eq!(snapshot.system.threads, Some(9));
    }

    #[test]
    fn test_rates_use_final_counters() {
        let mut builder = SnapshotBuilder::new();
        for (metric, value) in [
            ("query_total", 10.0),
            ("hit_total", 5.0),
            ("query_total", 100.0),
        ] {
            builder.accept(MetricLine::Cache {
                metric: metric.into(),
                tag: "t".into(),
                value,
            });
        }
        assert_eq!(builder.cache_tags(), 1);
        let snapshot = builder.finish();
        assert_eq!(snapshot.caches["t"].hit_rate, "5.00%");
    }

    #[test]
    fn test_derived_rate_replaces_upstream_series() {
        let snapshot = parse_metrics(
            "mosdns_cache_hit_rate{tag=\"t\"} 0.5\nmosdns_cache_query_total{tag=\"t\"} 4\n",
        );
        let stats = &snapshot.caches["t"];
        assert_eq!(stats.counter("hit_rate"), None);
        assert_eq!(stats.hit_rate, "0.00%");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(1.0, 3.0), "33.33%");
        assert_eq!(format_rate(2.0, 3.0), "66.67%");
        assert_eq!(format_rate(5.0, 0.0), "0.00%");
        assert_eq!(format_rate(5.0, -1.0), "0.00%");
    }

    #[test]
    fn test_format_mebibytes() {
        assert_eq!(format_mebibytes(0.0), "0.00 MB");
        assert_eq!(format_mebibytes(1572864.0), "1.50 MB");
    }

    #[test]
    fn test_format_start_time_shape() {
        let formatted = format_start_time(1_700_000_000.25);
        assert_eq!(formatted.len(), 19);
        assert_eq!(&formatted[4..5], "-");
        assert_eq!(&formatted[13..14], ":");
    }

    #[test]
    fn test_format_start_time_out_of_range() {
        assert_eq!(format_start_time(1e300), format!("{}", 1e300));
    }

    #[test]
    fn test_cpu_time_formatting() {
        let snapshot = parse_metrics("process_cpu_seconds_total 12.5\n");
        assert_eq!(snapshot.system.cpu_time.as_deref(), Some("12.50 s"));
    }

    #[test]
    fn test_detailed_report_counts_lines() {
        let text = "go_threads 4\nprocess_open_fds x\ngo_threads nope\nunrelated 1\n";
        let parsed = parse_metrics_detailed(text);
        assert_eq!(parsed.recognized_lines, 1);
        // "process_open_fds x" does not match the digit pattern at all.
        assert!(parsed.malformed.is_empty());
        assert_eq!(parsed.snapshot.system.threads, Some(4));
        assert_eq!(parsed.snapshot.system.open_fds, None);
    }
}
