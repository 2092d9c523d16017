//! Mock implementations for testing.
//!
//! Configurable stand-ins for the fetcher and classifier seams, with call
//! recording for verification.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::backend::Classifier;
use crate::error::{ClassifyError, ClassifyResult, CredentialError, FetchError, FetchResult};
use crate::fetch::Fetcher;
use crate::types::{ClassifiedPage, TagSet};

/// Mock fetcher returning canned text, with per-URL failure injection.
#[derive(Default)]
pub struct MockFetcher {
    content: String,
    failing: HashSet<String>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            content: "mock page content".to_string(),
            failing: HashSet::new(),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the text every successful fetch returns.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Make fetches of `url` fail with `AllStrategiesFailed`.
    pub fn failing_for(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.calls.write().unwrap().push(url.to_string());

        if self.failing.contains(url) {
            return Err(FetchError::AllStrategiesFailed {
                url: url.to_string(),
                attempts: "direct: HTTP 500; allorigins: timeout".to_string(),
            });
        }

        Ok(self.content.clone())
    }
}

/// Mock classifier producing deterministic pages, with per-URL failure
/// injection.
#[derive(Default)]
pub struct MockClassifier {
    failing: HashSet<String>,
    credential_failing: HashSet<String>,
    failing_preflight: bool,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            credential_failing: HashSet::new(),
            failing_preflight: false,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Make classification of `url` fail.
    pub fn failing_for(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Make classification of `url` fail with a credential error, as if
    /// credentials expired mid-run.
    pub fn credential_failing_for(mut self, url: impl Into<String>) -> Self {
        self.credential_failing.insert(url.into());
        self
    }

    /// Make the up-front credential check fail.
    pub fn with_failing_preflight(mut self) -> Self {
        self.failing_preflight = true;
        self
    }

    /// URLs classified so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn preflight(&self) -> ClassifyResult<()> {
        if self.failing_preflight {
            return Err(ClassifyError::Credential(
                CredentialError::MissingCredentials,
            ));
        }
        Ok(())
    }

    async fn classify(&self, url: &str, _content: &str) -> ClassifyResult<ClassifiedPage> {
        self.calls.write().unwrap().push(url.to_string());

        if self.credential_failing.contains(url) {
            return Err(ClassifyError::Credential(
                CredentialError::MissingCredentials,
            ));
        }

        if self.failing.contains(url) {
            return Err(ClassifyError::Failed {
                message: format!("mock classification failure for {url}"),
            });
        }

        Ok(ClassifiedPage {
            url: url.to_string(),
            title: format!("Title for {url}"),
            summary: format!("Summary for {url}."),
            tags: TagSet {
                personas: vec!["personas:patient".to_string()],
                types: vec!["types:autoimmune".to_string()],
                stages: Vec::new(),
                topics: vec!["topics:research".to_string()],
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetcher_records_calls() {
        let fetcher = MockFetcher::new().with_content("abc");
        let text = fetcher.fetch("https://example.com").await.unwrap();
        assert_eq!(text, "abc");
        assert_eq!(fetcher.calls(), vec!["https://example.com"]);
    }

    #[tokio::test]
    async fn test_mock_fetcher_failure_injection() {
        let fetcher = MockFetcher::new().failing_for("https://example.com/bad");
        let err = fetcher.fetch("https://example.com/bad").await.unwrap_err();
        assert!(matches!(err, FetchError::AllStrategiesFailed { .. }));
    }

    #[tokio::test]
    async fn test_mock_classifier_preflight_failure_injection() {
        let classifier = MockClassifier::new().with_failing_preflight();
        let err = classifier.preflight().await.unwrap_err();
        assert!(matches!(err, ClassifyError::Credential(_)));

        assert!(MockClassifier::new().preflight().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_classifier_is_deterministic() {
        let classifier = MockClassifier::new();
        let page = classifier.classify("https://example.com", "text").await.unwrap();
        assert_eq!(page.url, "https://example.com");
        assert!(!page.tags.is_empty());
    }
}
