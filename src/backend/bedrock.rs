//! Bedrock implementation of the Classifier trait.
//!
//! Resolves credentials through [`CredentialResolver`], then issues a single
//! prompt-based Converse call. There is no schema enforcement: the prompt
//! instructs the model to emit bare JSON, and the response is stripped of
//! code fences before parsing. Failures are never auto-retried here;
//! caller-level pacing is relied upon instead.

use async_trait::async_trait;
use aws_credential_types::Credentials as AwsCredentials;
use aws_sdk_bedrockruntime::config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::error::ProvideErrorMetadata;
use aws_sdk_bedrockruntime::types::{ContentBlock, ConversationRole, Message};
use aws_sdk_bedrockruntime::{Client, Config};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::backend::{strip_code_fences, Classifier, ClassificationPayload, TAXONOMY_INSTRUCTION};
use crate::credentials::{BedrockAuth, CredentialResolver};
use crate::error::{ClassifyError, ClassifyResult};
use crate::types::ClassifiedPage;

/// Bedrock-based classification backend.
pub struct BedrockClassifier {
    auth: BedrockAuth,
    region: String,
    model_id: String,
    resolver: CredentialResolver,
}

impl BedrockClassifier {
    pub fn new(auth: BedrockAuth, region: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            auth,
            region: region.into(),
            model_id: model_id.into(),
            resolver: CredentialResolver::new(),
        }
    }

    /// Inject a resolver (for tests with a canned exchange endpoint).
    pub fn with_resolver(mut self, resolver: CredentialResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Build a client for the current credentials.
    ///
    /// Rebuilt per call because exchanged credentials can rotate between
    /// queue items.
    async fn client(&self) -> ClassifyResult<Client> {
        let credential = self.resolver.resolve(&self.auth).await?;

        let aws_credentials = AwsCredentials::new(
            credential.access_key_id,
            credential.secret_access_key,
            credential.session_token,
            credential.expiration.map(SystemTime::from),
            "classification-resolver",
        );

        let config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(aws_credentials)
            .build();

        Ok(Client::from_conf(config))
    }

    fn prompt(url: &str, content: &str) -> String {
        format!(
            "{TAXONOMY_INSTRUCTION}\n\n\
             Respond with a single JSON object of the shape\n\
             {{\"title\": string, \"summary\": string, \"tags\": \
             {{\"personas\": string[], \"types\": string[], \"stages\": string[], \
             \"topics\": string[]}}}}\n\
             with no surrounding prose and no Markdown fencing.\n\n\
             URL: {url}\n\nPage text:\n{content}"
        )
    }
}

#[async_trait]
impl Classifier for BedrockClassifier {
    /// Resolve credentials once up front. Exercises the full resolution
    /// path (including any key exchange) and primes the resolver cache.
    async fn preflight(&self) -> ClassifyResult<()> {
        self.resolver.resolve(&self.auth).await?;
        Ok(())
    }

    async fn classify(&self, url: &str, content: &str) -> ClassifyResult<ClassifiedPage> {
        let client = self.client().await?;

        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(Self::prompt(url, content)))
            .build()
            .map_err(|e| ClassifyError::Failed {
                message: e.to_string(),
            })?;

        let response = client
            .converse()
            .model_id(&self.model_id)
            .messages(message)
            .send()
            .await
            .map_err(|e| {
                let code = e.code().map(str::to_string);
                let message = e.message().map(str::to_string).unwrap_or_else(|| e.to_string());
                warn!(url = %url, code = ?code, "Bedrock converse call failed");
                map_bedrock_error(code.as_deref(), &message)
            })?;

        let text = response
            .output()
            .and_then(|output| output.as_message().ok())
            .map(|message| {
                message
                    .content()
                    .iter()
                    .filter_map(|block| block.as_text().ok().cloned())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }

        debug!(url = %url, "Bedrock classification succeeded");
        ClassificationPayload::parse(url, strip_code_fences(&text))
    }
}

/// Map a Converse error to a user-facing failure subtype.
///
/// Model/throughput configuration problems and credential problems get
/// distinct hints; everything else is generic.
fn map_bedrock_error(code: Option<&str>, message: &str) -> ClassifyError {
    match code {
        Some("ValidationException") | Some("ResourceNotFoundException") => {
            ClassifyError::ModelConfig {
                hint: format!(
                    "check the model identifier and that it is available in the \
                     configured region: {message}"
                ),
            }
        }
        Some("AccessDeniedException")
        | Some("UnrecognizedClientException")
        | Some("ExpiredTokenException")
        | Some("InvalidSignatureException") => ClassifyError::Auth {
            hint: format!(
                "check the access keys, region, and session token expiry: {message}"
            ),
        },
        _ => ClassifyError::Failed {
            message: message.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_maps_to_model_config() {
        let err = map_bedrock_error(Some("ValidationException"), "on-demand throughput");
        assert!(matches!(err, ClassifyError::ModelConfig { .. }));
    }

    #[test]
    fn test_auth_errors_map_to_auth() {
        for code in [
            "AccessDeniedException",
            "UnrecognizedClientException",
            "ExpiredTokenException",
        ] {
            let err = map_bedrock_error(Some(code), "denied");
            assert!(matches!(err, ClassifyError::Auth { .. }), "{code}");
        }
    }

    #[test]
    fn test_unknown_error_maps_to_generic() {
        let err = map_bedrock_error(Some("ThrottlingException"), "slow down");
        assert!(matches!(err, ClassifyError::Failed { .. }));

        let err = map_bedrock_error(None, "connection reset");
        assert!(matches!(err, ClassifyError::Failed { .. }));
    }

    #[test]
    fn test_prompt_demands_bare_json() {
        let prompt = BedrockClassifier::prompt("https://example.com", "text");
        assert!(prompt.contains("no Markdown fencing"));
        assert!(prompt.contains("https://example.com"));
        assert!(prompt.contains("personas"));
    }
}
