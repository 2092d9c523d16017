//! Retrieval strategies for page content.
//!
//! Each strategy is one way of reaching a URL: directly, or through a
//! third-party proxy with its own URL-encoding and response-unwrapping
//! convention. Strategies are tried strictly in order; the first one that
//! produces usable content wins and the rest are skipped.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Why a single strategy attempt failed.
///
/// Rendered into the per-strategy diagnostics carried by
/// [`FetchError::AllStrategiesFailed`](crate::error::FetchError).
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The attempt exceeded its time budget
    #[error("timeout")]
    Timeout,

    /// Non-success HTTP status
    #[error("HTTP {0}")]
    Status(u16),

    /// Transport-level failure (DNS, TLS, connection reset)
    #[error("{0}")]
    Transport(String),

    /// Response body was too short to be real content.
    /// Some proxies return empty placeholders on success status codes.
    #[error("content too short ({0} chars)")]
    TooShort(usize),

    /// Proxy envelope could not be unwrapped
    #[error("unwrap failed: {0}")]
    Unwrap(String),
}

/// Result of a single strategy attempt.
pub type AttemptResult = std::result::Result<String, AttemptError>;

/// One way of retrieving a URL's raw content.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Short name used in diagnostics (e.g. "direct", "allorigins").
    fn name(&self) -> &str;

    /// Attempt to retrieve the raw body of `url`.
    ///
    /// Implementations handle their own URL encoding and response
    /// unwrapping but not timeouts; the caller bounds each attempt.
    async fn attempt(&self, client: &Client, url: &str) -> AttemptResult;
}

async fn get_text(client: &Client, request_url: &str) -> AttemptResult {
    let response = client
        .get(request_url)
        .send()
        .await
        .map_err(|e| AttemptError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AttemptError::Status(status.as_u16()));
    }

    response
        .text()
        .await
        .map_err(|e| AttemptError::Transport(e.to_string()))
}

/// Plain GET against the target URL, no proxy.
pub struct DirectStrategy;

#[async_trait]
impl FetchStrategy for DirectStrategy {
    fn name(&self) -> &str {
        "direct"
    }

    async fn attempt(&self, client: &Client, url: &str) -> AttemptResult {
        debug!(url = %url, "direct fetch");
        get_text(client, url).await
    }
}

/// AllOrigins proxy. Wraps the upstream body in a JSON envelope:
/// `{"contents": "...", "status": {...}}`.
pub struct AllOriginsStrategy {
    base: String,
}

impl AllOriginsStrategy {
    pub fn new() -> Self {
        Self {
            base: "https://api.allorigins.win/get?url=".to_string(),
        }
    }

    /// Point at a different envelope-compatible endpoint (for tests).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

impl Default for AllOriginsStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct AllOriginsEnvelope {
    contents: Option<String>,
}

#[async_trait]
impl FetchStrategy for AllOriginsStrategy {
    fn name(&self) -> &str {
        "allorigins"
    }

    async fn attempt(&self, client: &Client, url: &str) -> AttemptResult {
        let request_url = format!("{}{}", self.base, encode_target(url));
        debug!(url = %url, "allorigins fetch");
        let body = get_text(client, &request_url).await?;

        let envelope: AllOriginsEnvelope =
            serde_json::from_str(&body).map_err(|e| AttemptError::Unwrap(e.to_string()))?;

        envelope
            .contents
            .ok_or_else(|| AttemptError::Unwrap("envelope missing contents".to_string()))
    }
}

/// corsproxy.io style pass-through proxy. Returns the upstream body as-is.
pub struct CorsProxyStrategy {
    base: String,
}

impl CorsProxyStrategy {
    pub fn new() -> Self {
        Self {
            base: "https://corsproxy.io/?url=".to_string(),
        }
    }

    /// Point at a different pass-through endpoint (for tests).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

impl Default for CorsProxyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for CorsProxyStrategy {
    fn name(&self) -> &str {
        "corsproxy"
    }

    async fn attempt(&self, client: &Client, url: &str) -> AttemptResult {
        let request_url = format!("{}{}", self.base, encode_target(url));
        debug!(url = %url, "corsproxy fetch");
        get_text(client, &request_url).await
    }
}

/// Percent-encode a URL for embedding as a query parameter.
fn encode_target(url: &str) -> String {
    url::form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

/// The default strategy order: direct first, then proxies.
pub fn default_strategies() -> Vec<Box<dyn FetchStrategy>> {
    vec![
        Box::new(DirectStrategy),
        Box::new(AllOriginsStrategy::new()),
        Box::new(CorsProxyStrategy::new()),
    ]
}
