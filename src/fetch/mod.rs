//! Content fetching with ordered strategy fallback.
//!
//! A [`PageFetcher`] walks an ordered list of [`FetchStrategy`]s, accepting
//! the first one that returns plausible content, then cleans the markup
//! down to bounded plain text.

pub mod clean;
pub mod strategies;

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult};
use strategies::{default_strategies, AttemptError, FetchStrategy};

pub use clean::{clean_html, MAX_CONTENT_CHARS};
pub use strategies::{AllOriginsStrategy, CorsProxyStrategy, DirectStrategy};

/// Minimum accepted body length. Some proxies return empty placeholders
/// on success status codes.
pub const MIN_CONTENT_CHARS: usize = 50;

/// Per-strategy attempt time budget.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can turn a URL into cleaned page text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return cleaned, bounded text.
    async fn fetch(&self, url: &str) -> FetchResult<String>;
}

/// Fetches pages through an ordered list of retrieval strategies.
///
/// Strategies are tried strictly in sequence; the first one producing
/// content is accepted and the rest are skipped. No strategy is retried.
pub struct PageFetcher {
    client: Client,
    strategies: Vec<Box<dyn FetchStrategy>>,
    attempt_timeout: Duration,
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFetcher {
    /// Create a fetcher with the default strategy order.
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            strategies: default_strategies(),
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }

    /// Replace the strategy list.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn FetchStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Override the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Retrieve the raw body of `url`, walking strategies in order.
    async fn fetch_raw(&self, url: &str) -> FetchResult<String> {
        let mut failures: Vec<String> = Vec::new();

        for strategy in &self.strategies {
            let attempt = tokio::time::timeout(
                self.attempt_timeout,
                strategy.attempt(&self.client, url),
            );

            let outcome = match attempt.await {
                Ok(result) => result,
                Err(_) => Err(AttemptError::Timeout),
            };

            match outcome {
                Ok(body) => {
                    let chars = body.chars().count();
                    if chars > MIN_CONTENT_CHARS {
                        debug!(
                            url = %url,
                            strategy = strategy.name(),
                            chars,
                            "strategy succeeded"
                        );
                        return Ok(body);
                    }
                    warn!(
                        url = %url,
                        strategy = strategy.name(),
                        chars,
                        "strategy returned placeholder-length body"
                    );
                    failures.push(format!(
                        "{}: {}",
                        strategy.name(),
                        AttemptError::TooShort(chars)
                    ));
                }
                Err(e) => {
                    warn!(url = %url, strategy = strategy.name(), error = %e, "strategy failed");
                    failures.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        Err(FetchError::AllStrategiesFailed {
            url: url.to_string(),
            attempts: failures.join("; "),
        })
    }
}

#[async_trait]
impl Fetcher for PageFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        info!(url = %url, "fetching page");
        let raw = self.fetch_raw(url).await?;
        let text = clean_html(url, &raw)?;
        debug!(url = %url, chars = text.chars().count(), "page cleaned");
        Ok(text)
    }
}
