//! Sequential processing queue.
//!
//! Orchestrates sitemap URLs through fetch → classify, one item at a time,
//! with resumable merge semantics, per-item error isolation, progress and
//! ETA reporting, and cooperative cancellation. Credential failures are the
//! one non-isolated error: they abort the run.

use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::{Classifier, Provider};
use crate::error::{ClassifyError, PipelineError, Result};
use crate::fetch::Fetcher;
use crate::types::ClassifiedPage;

/// Per-URL state machine.
///
/// `Pending → Scraping → Classifying → Completed`, with `Error` reachable
/// from `Scraping` or `Classifying` on any unrecovered failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Scraping,
    Classifying,
    Completed,
    Error,
}

impl ItemState {
    /// Completed or Error: nothing more will happen to this item.
    pub fn is_resolved(self) -> bool {
        matches!(self, ItemState::Completed | ItemState::Error)
    }
}

/// Live status of one queue item. Owned and mutated exclusively by
/// [`ProcessingQueue`]; observers see clones in progress snapshots.
#[derive(Debug, Clone)]
pub struct ProcessingStatus {
    pub url: String,
    pub state: ItemState,
    pub data: Option<ClassifiedPage>,
    pub error: Option<String>,
}

impl ProcessingStatus {
    fn pending(url: String) -> Self {
        Self {
            url,
            state: ItemState::Pending,
            data: None,
            error: None,
        }
    }

    fn completed(page: ClassifiedPage) -> Self {
        Self {
            url: page.url.clone(),
            state: ItemState::Completed,
            data: Some(page),
            error: None,
        }
    }
}

/// A progress snapshot published to observers after each mutation.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// Per-item status, in queue order
    pub items: Vec<ProcessingStatus>,

    /// Resolved items / total items × 100. Reaches 100 exactly when every
    /// item is Completed or Error.
    pub percent: f32,

    /// Rolling estimate of remaining wall-clock time. `None` until at
    /// least one item has been processed in this run.
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            percent: 100.0,
            eta: None,
        }
    }
}

/// Pacing configuration for a run.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Fixed delay between items, respecting provider rate limits.
    pub pacing: Duration,
}

impl QueueConfig {
    /// Provider-appropriate pacing: the schema-constrained backend is the
    /// more aggressively rate-limited of the two.
    pub fn for_backend(provider: Provider) -> Self {
        let pacing = match provider {
            Provider::Gemini => Duration::from_secs(2),
            Provider::Bedrock => Duration::from_millis(500),
        };
        Self { pacing }
    }

    /// Override the pacing delay.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_secs(1),
        }
    }
}

/// Sequential fetch-and-classify queue over an ordered URL list.
pub struct ProcessingQueue {
    items: Vec<ProcessingStatus>,
    config: QueueConfig,
    cancel: CancellationToken,
    progress_tx: watch::Sender<ProgressSnapshot>,
    progress_rx: watch::Receiver<ProgressSnapshot>,
}

impl ProcessingQueue {
    /// Build a queue from sitemap URLs and prior results.
    ///
    /// URLs are deduplicated by first occurrence. Any URL already present
    /// in `prior` is initialized directly into `Completed` with its
    /// existing data and will be skipped during execution: no re-fetch,
    /// no re-spent quota.
    pub fn new(urls: Vec<String>, prior: &[ClassifiedPage], config: QueueConfig) -> Self {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for url in urls {
            if !seen.insert(url.clone()) {
                continue;
            }
            match prior.iter().find(|p| p.url == url) {
                Some(page) => items.push(ProcessingStatus::completed(page.clone())),
                None => items.push(ProcessingStatus::pending(url)),
            }
        }

        info!(
            total = items.len(),
            already_complete = items.iter().filter(|i| i.state == ItemState::Completed).count(),
            "queue prepared"
        );

        let (progress_tx, progress_rx) = watch::channel(ProgressSnapshot::empty());
        let queue = Self {
            items,
            config,
            cancel: CancellationToken::new(),
            progress_tx,
            progress_rx,
        };
        queue.publish(None);
        queue
    }

    /// Subscribe to progress snapshots.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_rx.clone()
    }

    /// Token observers can use to stop the run. Cancellation is
    /// cooperative: checked before each item, never mid-operation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current per-item statuses.
    pub fn items(&self) -> &[ProcessingStatus] {
        &self.items
    }

    /// True when every item is Completed or Error.
    pub fn is_finished(&self) -> bool {
        self.items.iter().all(|i| i.state.is_resolved())
    }

    /// Run the queue to completion (or cancellation).
    ///
    /// Strictly sequential. Per-item fetch and classification failures are
    /// recorded and do not abort the run; credential failures do, because
    /// every remaining item would fail the same unrecoverable way. Returns
    /// every `Completed` item's data in queue order, merged prior results
    /// included.
    pub async fn run(
        &mut self,
        fetcher: &dyn Fetcher,
        classifier: &dyn Classifier,
    ) -> Result<Vec<ClassifiedPage>> {
        // Credentials are checked once before any item starts. A queue
        // with nothing pending skips the check entirely.
        if self.items.iter().any(|i| i.state == ItemState::Pending) {
            if let Err(e) = classifier.preflight().await {
                error!(error = %e, "backend preflight failed, aborting run");
                return Err(Self::abort_error(e));
            }
        }

        let started = Instant::now();
        let mut processed: u32 = 0;

        for idx in 0..self.items.len() {
            if self.cancel.is_cancelled() {
                info!("cancellation requested, stopping before next item");
                break;
            }
            if self.items[idx].state != ItemState::Pending {
                continue;
            }

            if processed > 0 {
                tokio::time::sleep(self.config.pacing).await;
            }

            let url = self.items[idx].url.clone();
            self.set_state(idx, ItemState::Scraping, None);

            match fetcher.fetch(&url).await {
                Ok(text) => {
                    self.set_state(idx, ItemState::Classifying, None);
                    match classifier.classify(&url, &text).await {
                        Ok(page) => {
                            self.items[idx].data = Some(page);
                            self.set_state(idx, ItemState::Completed, None);
                        }
                        Err(ClassifyError::Credential(e)) => {
                            // Credentials went bad mid-run (e.g. expired
                            // exchange). Remaining items stay Pending and
                            // resumable.
                            error!(url = %url, error = %e, "credential failure, aborting run");
                            self.set_state(idx, ItemState::Error, Some(e.to_string()));
                            return Err(PipelineError::Credential(e));
                        }
                        Err(e) => {
                            warn!(url = %url, error = %e, "classification failed");
                            self.set_state(idx, ItemState::Error, Some(e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "fetch failed");
                    self.set_state(idx, ItemState::Error, Some(e.to_string()));
                }
            }

            processed += 1;
            let eta = self.estimate_eta(started.elapsed(), processed);
            self.publish(eta);
        }

        Ok(self
            .items
            .iter()
            .filter_map(|item| item.data.clone())
            .collect())
    }

    /// Credential failures keep their subtype at the top level; any other
    /// preflight failure is reported as a classification error.
    fn abort_error(e: ClassifyError) -> PipelineError {
        match e {
            ClassifyError::Credential(inner) => PipelineError::Credential(inner),
            other => PipelineError::Classify(other),
        }
    }

    fn set_state(&mut self, idx: usize, state: ItemState, error: Option<String>) {
        self.items[idx].state = state;
        self.items[idx].error = error;
        let eta = self.progress_rx.borrow().eta;
        self.publish(eta);
    }

    /// Rolling average time-per-item times the count of still-unresolved
    /// items. Approaches zero as the queue drains.
    fn estimate_eta(&self, elapsed: Duration, processed: u32) -> Option<Duration> {
        if processed == 0 {
            return None;
        }
        let unresolved = self
            .items
            .iter()
            .filter(|i| !i.state.is_resolved())
            .count() as u32;
        Some(elapsed / processed * unresolved)
    }

    fn publish(&self, eta: Option<Duration>) {
        let total = self.items.len();
        let percent = if total == 0 {
            100.0
        } else {
            let resolved = self.items.iter().filter(|i| i.state.is_resolved()).count();
            resolved as f32 / total as f32 * 100.0
        };

        let _ = self.progress_tx.send(ProgressSnapshot {
            items: self.items.clone(),
            percent,
            eta,
        });
    }
}
