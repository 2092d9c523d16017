//! Sitemap-Driven Content Classification Pipeline
//!
//! Ingests a sitemap, retrieves and cleans the textual content of each
//! listed page, and classifies that content against a fixed taxonomy using
//! a pluggable AI backend.
//!
//! # Design
//!
//! - Strictly sequential: one URL in flight at a time, to respect provider
//!   rate limits and keep failure attribution unambiguous
//! - Strategy-list fallback for retrieval: ordered attempts, first success
//!   wins
//! - Resumable: prior results pre-complete matching URLs so re-running a
//!   sitemap never re-spends quota
//! - Per-item error isolation: one bad page never aborts a run, but a
//!   credential failure does, since every remaining item would hit it too
//!
//! # Usage
//!
//! ```rust,ignore
//! use classification::{
//!     parse_sitemap, build_classifier, BackendConfig, PageFetcher,
//!     ProcessingQueue, QueueConfig,
//! };
//!
//! let urls = parse_sitemap(&sitemap_text);
//! let config = BackendConfig::Gemini { api_key: key.into(), model: "gemini-2.0-flash".into() };
//! let pacing = QueueConfig::for_backend(config.provider());
//! let classifier = build_classifier(config);
//! let fetcher = PageFetcher::new();
//!
//! let mut queue = ProcessingQueue::new(urls, &prior_results, pacing);
//! let results = queue.run(&fetcher, classifier.as_ref()).await?;
//! ```
//!
//! # Modules
//!
//! - [`sitemap`] - Sitemap parsing with textual fallback
//! - [`fetch`] - Multi-strategy content fetching and markup cleanup
//! - [`credentials`] - Credential normalization for the Bedrock backend
//! - [`backend`] - Gemini and Bedrock classification backends
//! - [`queue`] - Sequential orchestration with resume and cancellation
//! - [`results`] - Results collection import/export
//! - [`testing`] - Mock implementations for testing

pub mod backend;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod queue;
pub mod results;
pub mod security;
pub mod sitemap;
pub mod testing;
pub mod types;

// Re-export core types at crate root
pub use error::{ClassifyError, CredentialError, FetchError, PipelineError};
pub use types::{ClassifiedPage, TagSet};

pub use backend::{build_classifier, BackendConfig, Classifier, Provider};
pub use credentials::{BedrockAuth, Credential, CredentialResolver};
pub use fetch::{Fetcher, PageFetcher};
pub use queue::{ItemState, ProcessingQueue, ProcessingStatus, ProgressSnapshot, QueueConfig};
pub use results::{export_results, import_results};
pub use security::SecretString;
pub use sitemap::parse_sitemap;
