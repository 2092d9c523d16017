//! Classification backends.
//!
//! Two interchangeable backends share the [`Classifier`] contract: a
//! schema-constrained Gemini client and a prompt-based Bedrock client.
//! Both produce a [`ClassifiedPage`] for a (url, cleaned text) pair.

pub mod bedrock;
pub mod gemini;

use async_trait::async_trait;
use serde::Deserialize;

use crate::credentials::BedrockAuth;
use crate::error::{ClassifyError, ClassifyResult};
use crate::security::SecretString;
use crate::types::{ClassifiedPage, TagSet};

pub use bedrock::BedrockClassifier;
pub use gemini::GeminiClassifier;

/// Which backend a run is configured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Bedrock,
}

/// Backend selection plus everything needed to call it.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Gemini {
        api_key: SecretString,
        model: String,
    },
    Bedrock {
        auth: BedrockAuth,
        region: String,
        model_id: String,
    },
}

impl BackendConfig {
    pub fn provider(&self) -> Provider {
        match self {
            BackendConfig::Gemini { .. } => Provider::Gemini,
            BackendConfig::Bedrock { .. } => Provider::Bedrock,
        }
    }
}

/// A classification backend.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify cleaned page text against the taxonomy.
    async fn classify(&self, url: &str, content: &str) -> ClassifyResult<ClassifiedPage>;

    /// Verify the backend can authenticate, without classifying anything.
    ///
    /// Called once at the start of a queue run so a terminal credential
    /// problem surfaces before any quota is spent. The default is a no-op
    /// for backends whose credentials cannot be validated ahead of time.
    async fn preflight(&self) -> ClassifyResult<()> {
        Ok(())
    }
}

/// Build the configured backend.
pub fn build_classifier(config: BackendConfig) -> Box<dyn Classifier> {
    match config {
        BackendConfig::Gemini { api_key, model } => {
            Box::new(GeminiClassifier::new(api_key).with_model(model))
        }
        BackendConfig::Bedrock {
            auth,
            region,
            model_id,
        } => Box::new(BedrockClassifier::new(auth, region, model_id)),
    }
}

/// The taxonomy instruction shared by both backends.
///
/// Tag values are category-prefixed strings; the backends are instructed
/// to stay inside this vocabulary, but parsing never enforces it.
pub const TAXONOMY_INSTRUCTION: &str = "\
You are classifying pages from a health-information website for people \
affected by encephalitis. For the page you are given, produce a short title, \
a one-paragraph summary, and tags in four categories. Every tag must be a \
\"category:value\" string.

Vocabulary:
- personas: patient, caregiver, parent, professional, bereaved
- types: autoimmune, infectious, post_infectious (a specific subtype may be \
appended as its own types: tag, e.g. \"types:hsv\")
- stages: pre_diagnosis, acute_hospital, early_recovery, long_term_management
- topics: memory, behaviour, legal, school, travel, research

Any category may be left empty when nothing applies.";

/// The parsed { title, summary, tags } object both backends produce.
#[derive(Debug, Deserialize)]
pub(crate) struct ClassificationPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: TagSet,
}

impl ClassificationPayload {
    /// Parse a backend's JSON text and merge it with the caller's URL.
    pub fn parse(url: &str, json: &str) -> ClassifyResult<ClassifiedPage> {
        let payload: ClassificationPayload =
            serde_json::from_str(json).map_err(|e| ClassifyError::InvalidResponseShape {
                reason: e.to_string(),
            })?;

        Ok(ClassifiedPage::from_parts(
            url,
            payload.title,
            payload.summary,
            payload.tags,
        ))
    }
}

/// Strip Markdown code-fence markers that some models wrap around JSON.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };

    // Drop an optional language hint on the opening fence line.
    let inner = match inner.find('\n') {
        Some(idx) => &inner[idx + 1..],
        None => inner,
    };

    inner.strip_suffix("```").unwrap_or(inner).trim()
}
