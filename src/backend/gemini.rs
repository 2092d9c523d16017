//! Gemini implementation of the Classifier trait.
//!
//! Issues a single structured-generation request per page with a fixed
//! taxonomy response schema. Rate-limit responses (429) are retried with
//! exponential backoff; other failures are terminal. Transient non-429
//! failures are deliberately not retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{Classifier, ClassificationPayload, TAXONOMY_INSTRUCTION};
use crate::error::{ClassifyError, ClassifyResult};
use crate::security::SecretString;
use crate::types::ClassifiedPage;

/// Initial backoff after the first 429.
const BACKOFF_BASE: Duration = Duration::from_secs(5);

/// Maximum number of rate-limit retries before giving up.
const MAX_RETRIES: u32 = 5;

/// Gemini-based classification backend.
pub struct GeminiClassifier {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    backoff_base: Duration,
}

impl GeminiClassifier {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            backoff_base: BACKOFF_BASE,
        }
    }

    /// Set the model (default: gemini-2.0-flash).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for tests and proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Shrink the backoff base (for tests).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// The response schema: title, summary, and a tags object whose four
    /// arrays must be present (possibly empty).
    fn response_schema() -> serde_json::Value {
        let tag_array = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
        json!({
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "summary": { "type": "STRING" },
                "tags": {
                    "type": "OBJECT",
                    "properties": {
                        "personas": tag_array,
                        "types": tag_array,
                        "stages": tag_array,
                        "topics": tag_array
                    },
                    "required": ["personas", "types", "stages", "topics"]
                }
            },
            "required": ["title", "summary", "tags"]
        })
    }

    /// Issue one structured-generation request, without retry handling.
    async fn generate(&self, url: &str, content: &str) -> ClassifyResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("URL: {url}\n\nPage text:\n{content}"),
                }],
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: TAXONOMY_INSTRUCTION.to_string(),
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: Self::response_schema(),
                temperature: 0.0,
            },
        };

        let endpoint = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            self.api_key.expose()
        );

        let response = self
            .client
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifyError::Failed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::RateLimited {
                attempts: 1,
                message: body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Failed {
                message: format!("HTTP {status}: {body}"),
            });
        }

        let generated: GenerateResponse =
            response.json().await.map_err(|e| ClassifyError::InvalidResponseShape {
                reason: e.to_string(),
            })?;

        let text = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, url: &str, content: &str) -> ClassifyResult<ClassifiedPage> {
        let mut backoff = self.backoff_base;

        for attempt in 0..=MAX_RETRIES {
            match self.generate(url, content).await {
                Ok(text) => {
                    debug!(url = %url, "Gemini classification succeeded");
                    return ClassificationPayload::parse(url, &text);
                }
                Err(ClassifyError::RateLimited { message, .. }) => {
                    if attempt == MAX_RETRIES {
                        warn!(url = %url, "rate limit persisted through all retries");
                        return Err(ClassifyError::RateLimited {
                            attempts: attempt + 1,
                            message,
                        });
                    }
                    info!(
                        url = %url,
                        attempt = attempt + 1,
                        backoff_secs = backoff.as_secs_f64(),
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                // Anything else is terminal. Transient network errors are
                // intentionally not retried here.
                Err(e) => return Err(e),
            }
        }

        unreachable!("retry loop always returns")
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}
