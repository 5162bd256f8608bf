//! HTTP client for the mosdns admin server.
//!
//! Two kinds of calls go upstream: the metrics fetch behind the status
//! endpoint, and forwarded `/plugins/...` control requests. Both make a
//! single attempt bounded by a timeout. Any failure, including a non-2xx
//! status, comes back as an [`UpstreamError`] that names the URL tried.

use axum::body::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Default admin origin of a local mosdns instance.
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:9099";
/// Path of the exposition endpoint on the admin origin.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
/// Path prefix forwarded verbatim to the admin origin.
pub const PLUGINS_PREFIX: &str = "/plugins/";
/// Content type relayed when the upstream response has none.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub const DEFAULT_METRICS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure to get a usable response from the admin origin.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl UpstreamError {
    /// The URL that was attempted.
    pub fn url(&self) -> &str {
        match self {
            UpstreamError::InvalidUrl { url, .. }
            | UpstreamError::Timeout { url, .. }
            | UpstreamError::Transport { url, .. }
            | UpstreamError::Status { url, .. }
            | UpstreamError::Body { url, .. } => url,
        }
    }

    fn from_send(url: &str, timeout: Duration, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            UpstreamError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            UpstreamError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }

    fn from_body(url: &str, timeout: Duration, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            UpstreamError::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            UpstreamError::Body {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// A successful upstream response, relayed without interpretation.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Bytes,
}

/// Client bound to one admin origin.
///
/// Cheap to clone; the inner `reqwest::Client` shares its connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: String,
    metrics_path: String,
    metrics_timeout: Duration,
    proxy_timeout: Duration,
}

impl UpstreamClient {
    /// Creates a client for `base_url` with default path and timeouts.
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            metrics_timeout: DEFAULT_METRICS_TIMEOUT,
            proxy_timeout: DEFAULT_PROXY_TIMEOUT,
        })
    }

    pub fn with_metrics_path(mut self, path: &str) -> Self {
        self.metrics_path = path.to_string();
        self
    }

    pub fn with_timeouts(mut self, metrics: Duration, proxy: Duration) -> Self {
        self.metrics_timeout = metrics;
        self.proxy_timeout = proxy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metrics_url(&self) -> String {
        format!("{}{}", self.base_url, self.metrics_path)
    }

    pub fn plugins_url(&self, subpath: &str) -> String {
        format!("{}{}{}", self.base_url, PLUGINS_PREFIX, subpath)
    }

    /// Fetches the raw exposition text.
    pub async fn fetch_metrics(&self) -> Result<String, UpstreamError> {
        let url = self.metrics_url();
        let response = self.send(Method::GET, &url, self.metrics_timeout).await?;
        response
            .text()
            .await
            .map_err(|e| UpstreamError::from_body(&url, self.metrics_timeout, e))
    }

    /// Forwards a control request to `/plugins/<subpath>` on the admin origin.
    pub async fn forward(
        &self,
        method: Method,
        subpath: &str,
    ) -> Result<ProxiedResponse, UpstreamError> {
        let url = self.plugins_url(subpath);
        let response = self.send(method, &url, self.proxy_timeout).await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_body(&url, self.proxy_timeout, e))?;

        Ok(ProxiedResponse {
            status,
            content_type,
            body,
        })
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
    ) -> Result<reqwest::Response, UpstreamError> {
        let target = Url::parse(url).map_err(|e| UpstreamError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        debug!("{} {} (timeout {:?})", method, target, timeout);

        let response = self
            .http
            .request(method, target)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::from_send(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Upstream {} returned HTTP {}", url, status);
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = UpstreamClient::new("http://10.0.0.1:9099/").unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.1:9099");
        assert_eq!(client.metrics_url(), "http://10.0.0.1:9099/metrics");
        assert_eq!(
            client.plugins_url("fakeip/save"),
            "http://10.0.0.1:9099/plugins/fakeip/save"
        );
    }

    #[test]
    fn test_custom_metrics_path() {
        let client = UpstreamClient::new(DEFAULT_UPSTREAM_URL)
            .unwrap()
            .with_metrics_path("/debug/metrics");
        assert_eq!(client.metrics_url(), "http://127.0.0.1:9099/debug/metrics");
    }

    #[test]
    fn test_error_messages_name_url() {
        let err = UpstreamError::Status {
            url: "http://mosdns/plugins/x".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert!(err.to_string().contains("http://mosdns/plugins/x"));
        assert!(err.to_string().contains("404"));
        assert_eq!(err.url(), "http://mosdns/plugins/x");

        let err = UpstreamError::Timeout {
            url: "http://mosdns/metrics".into(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(
            err.to_string(),
            "request to http://mosdns/metrics timed out after 5s"
        );
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_reported() {
        let client = UpstreamClient::new("not a url").unwrap();
        let err = client.fetch_metrics().await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidUrl { .. }));
        assert_eq!(err.url(), "not a url/metrics");
    }
}
