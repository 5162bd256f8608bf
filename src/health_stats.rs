//! Health statistics and monitoring for the monitor itself.
//!
//! This module provides types for tracking upstream fetch and proxy
//! performance, skipped exposition lines, and HTTP request rates. The numbers
//! are observability only and never feed back into served snapshots.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (current, average, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Thread-safe circular buffer for tracking HTTP request timestamps.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            // Keep only last 10 minutes of timestamps
            if let Some(cutoff) = now.checked_sub(Duration::from_secs(600)) {
                while guard.front().is_some_and(|&t| t < cutoff) {
                    guard.pop_front();
                }
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            match Instant::now().checked_sub(Duration::from_secs(60)) {
                Some(cutoff) => guard.iter().filter(|&&t| t >= cutoff).count() as u64,
                None => guard.len() as u64,
            }
        } else {
            0
        }
    }
}

/// Health statistics for the monitor.
pub struct HealthStats {
    // Status endpoint
    pub status_requests: AtomicU64,
    pub upstream_fetch_failures: AtomicU64,
    pub upstream_fetch_ms: Stat,
    pub parsing_duration_ms: Stat,
    pub malformed_lines: AtomicU64,
    pub cache_tags: Stat,

    // Control proxy
    pub proxy_requests: AtomicU64,
    pub proxy_failures: AtomicU64,
    pub proxy_duration_ms: Stat,

    // HTTP server stats
    pub http_request_timestamps: RequestTimestamps,

    // Timing
    pub start_time: Instant,
    pub last_fetch_time: StdRwLock<Option<Instant>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            status_requests: AtomicU64::new(0),
            upstream_fetch_failures: AtomicU64::new(0),
            upstream_fetch_ms: Stat::default(),
            parsing_duration_ms: Stat::default(),
            malformed_lines: AtomicU64::new(0),
            cache_tags: Stat::default(),
            proxy_requests: AtomicU64::new(0),
            proxy_failures: AtomicU64::new(0),
            proxy_duration_ms: Stat::default(),
            http_request_timestamps: RequestTimestamps::default(),
            start_time: Instant::now(),
            last_fetch_time: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn record_status_request(&self) {
        self.status_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful metrics fetch and how it parsed.
    pub fn record_fetch(
        &self,
        fetch_ms: f64,
        parsing_ms: f64,
        cache_tags: u64,
        malformed_lines: u64,
    ) {
        self.upstream_fetch_ms.add_sample(fetch_ms);
        self.parsing_duration_ms.add_sample(parsing_ms);
        self.cache_tags.add_sample(cache_tags as f64);
        self.malformed_lines
            .fetch_add(malformed_lines, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_fetch_time.write() {
            *guard = Some(Instant::now());
        }
    }

    pub fn record_fetch_failure(&self) {
        self.upstream_fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_proxy_request(&self, duration_ms: f64) {
        self.proxy_requests.fetch_add(1, Ordering::Relaxed);
        self.proxy_duration_ms.add_sample(duration_ms);
    }

    pub fn record_proxy_failure(&self) {
        self.proxy_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_fetch_success_rate(&self) -> f64 {
        let total = self.status_requests.load(Ordering::Relaxed);
        let failures = self.upstream_fetch_failures.load(Ordering::Relaxed);
        if total == 0 {
            100.0
        } else {
            (total.saturating_sub(failures) as f64 / total as f64) * 100.0
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_fetch_age_str(&self) -> String {
        if let Ok(guard) = self.last_fetch_time.read() {
            if let Some(last) = *guard {
                return format!("{}s ago", last.elapsed().as_secs());
            }
        }
        "N/A".to_string()
    }

    pub fn render_table(&self) -> String {
        let (uf_cur, uf_avg, uf_max, uf_min, _) = self.upstream_fetch_ms.snapshot();
        let (pd_cur, pd_avg, pd_max, pd_min, _) = self.parsing_duration_ms.snapshot();
        let (ct_cur, ct_avg, ct_max, ct_min, _) = self.cache_tags.snapshot();
        let (px_cur, px_avg, px_max, px_min, _) = self.proxy_duration_ms.snapshot();

        let status_requests = self.status_requests.load(Ordering::Relaxed);
        let fetch_failures = self.upstream_fetch_failures.load(Ordering::Relaxed);
        let malformed = self.malformed_lines.load(Ordering::Relaxed);
        let proxy_requests = self.proxy_requests.load(Ordering::Relaxed);
        let proxy_failures = self.proxy_failures.load(Ordering::Relaxed);
        let http_requests_last_minute = self.http_request_timestamps.count_last_minute();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - MONITOR INTERNAL STATS").ok();
        writeln!(out, "========================================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "UPSTREAM METRICS").ok();
        writeln!(out, "----------------").ok();

        for (label, cur, avg, max, min) in [
            ("fetch_duration (ms)", uf_cur, uf_avg, uf_max, uf_min),
            ("parse_duration (ms)", pd_cur, pd_avg, pd_max, pd_min),
        ] {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                label,
                format!("{:.2}", cur),
                format!("{:.2}", avg),
                format!("{:.2}", max),
                format!("{:.2}", min),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "cache_tags",
            format!("{:.0}", ct_cur),
            format!("{:.1}", ct_avg),
            format!("{:.0}", ct_max),
            format!("{:.0}", ct_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "CONTROL PROXY").ok();
        writeln!(out, "-------------").ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "round_trip (ms)",
            format!("{:.2}", px_cur),
            format!("{:.2}", px_avg),
            format!("{:.2}", px_max),
            format!("{:.2}", px_min),
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "COUNTERS").ok();
        writeln!(out, "--------").ok();
        writeln!(out, "{:left$} | {}", "status_requests", status_requests, left = left_col).ok();
        writeln!(out, "{:left$} | {}", "upstream_fetch_failures", fetch_failures, left = left_col).ok();
        writeln!(
            out,
            "{:left$} | {:.1}",
            "fetch_success_rate (%)",
            self.get_fetch_success_rate(),
            left = left_col
        )
        .ok();
        writeln!(out, "{:left$} | {}", "malformed_lines_skipped", malformed, left = left_col).ok();
        writeln!(out, "{:left$} | {}", "proxy_requests", proxy_requests, left = left_col).ok();
        writeln!(out, "{:left$} | {}", "proxy_failures", proxy_failures, left = left_col).ok();
        writeln!(
            out,
            "{:left$} | {}",
            "http_requests_last_minute",
            http_requests_last_minute,
            left = left_col
        )
        .ok();
        writeln!(
            out,
            "{:left$} | {}",
            "last_successful_fetch",
            self.get_last_fetch_age_str(),
            left = left_col
        )
        .ok();

        out
    }
}
