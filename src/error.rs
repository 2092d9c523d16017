//! Typed errors for the classification pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Content fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Credential resolution failed
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Classification backend failed
    #[error("classification error: {0}")]
    Classify(#[from] ClassifyError),

    /// Imported results collection was rejected
    #[error("invalid results import: {reason}")]
    InvalidImport { reason: String },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Errors that can occur while fetching and cleaning page content.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every retrieval strategy was exhausted.
    ///
    /// `attempts` concatenates one "strategy: reason" line per strategy
    /// for diagnostics.
    #[error("all fetch strategies failed for {url}: {attempts}")]
    AllStrategiesFailed { url: String, attempts: String },

    /// Content was retrieved but could not be interpreted as markup.
    /// Strategies are not retried in this case.
    #[error("fetched content from {url} could not be parsed as markup")]
    ParseFailed { url: String },
}

/// Errors that can occur during credential resolution.
///
/// All of these are terminal: they are surfaced to the caller before any
/// queue execution begins.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Standard-mode access key or secret key was empty
    #[error("access key and secret key are required")]
    MissingCredentials,

    /// Literal credential string matched none of the supported formats
    #[error("unrecognized credential format: {reason}")]
    InvalidCredentialFormat { reason: String },

    /// Pre-signed credential exchange failed or returned an unusable payload
    #[error("credential exchange failed: {reason}")]
    KeyExchangeInvalid { reason: String },
}

/// Errors that can occur during a classification call.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Rate limit persisted through every backoff attempt
    #[error("rate limited after {attempts} attempts: {message}")]
    RateLimited { attempts: u32, message: String },

    /// Model or throughput configuration is wrong (bad model identifier)
    #[error("model configuration error: {hint}")]
    ModelConfig { hint: String },

    /// Authentication or authorization failed (bad keys, region mismatch,
    /// expired session token)
    #[error("authentication failed: {hint}")]
    Auth { hint: String },

    /// Backend replied with success but no usable content
    #[error("backend returned an empty response")]
    EmptyResponse,

    /// Backend replied but the payload did not match the expected shape
    #[error("malformed classification response: {reason}")]
    InvalidResponseShape { reason: String },

    /// Credential resolution failed before the call could be made
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Any other backend failure
    #[error("classification failed: {message}")]
    Failed { message: String },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Result type alias for classification operations.
pub type ClassifyResult<T> = std::result::Result<T, ClassifyError>;
