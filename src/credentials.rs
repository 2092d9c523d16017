//! Credential resolution for the Bedrock backend.
//!
//! Normalizes heterogeneous secret-string formats into a canonical
//! [`Credential`] record:
//!
//! 1. **Standard**: access key + secret key supplied directly.
//! 2. **API key, exchange-required**: a `bedrock-api-key-` prefixed string
//!    encoding a pre-signed credentials endpoint; exchanged over HTTP and
//!    cached until near expiration.
//! 3. **API key, literal**: a JSON object, a base64-encoded colon-delimited
//!    pair, or a raw colon-delimited pair.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CredentialError, CredentialResult};
use crate::security::SecretString;

/// Prefix marking an API key that encodes a pre-signed credentials endpoint.
pub const EXCHANGE_PREFIX: &str = "bedrock-api-key-";

/// Refresh this long before the recorded expiration.
const EXPIRY_MARGIN: ChronoDuration = ChronoDuration::minutes(5);

/// Assumed validity when the exchange response omits an expiration.
const DEFAULT_VALIDITY: ChronoDuration = ChronoDuration::hours(1);

/// Minimum plausible access key length for literal formats.
const MIN_ACCESS_KEY_LEN: usize = 16;

/// Minimum plausible secret length for literal formats.
const MIN_SECRET_LEN: usize = 10;

/// A canonical credential record, consumed once per classification call.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

impl Credential {
    /// Whether this credential is still comfortably inside its validity
    /// window (more than the safety margin before expiration).
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(exp) => now + EXPIRY_MARGIN < exp,
            None => true,
        }
    }
}

/// How the caller supplied Bedrock credential material.
#[derive(Debug, Clone)]
pub enum BedrockAuth {
    /// Access key, secret key, optional session token, supplied directly.
    Standard {
        access_key_id: String,
        secret_access_key: SecretString,
        session_token: Option<String>,
    },

    /// A single opaque API-key string in one of the formats this module
    /// understands.
    ApiKey(SecretString),
}

/// Resolves [`BedrockAuth`] into a [`Credential`].
///
/// Exchanged (temporary) credentials are cached on the resolver instance
/// and reused until near expiration. Execution in this crate is sequential,
/// but the cache is behind a mutex so concurrent callers stay correct.
pub struct CredentialResolver {
    client: Client,
    cached: Mutex<Option<Credential>>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            cached: Mutex::new(None),
        }
    }

    /// Set a custom HTTP client (for tests).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Resolve credential material into a canonical record.
    pub async fn resolve(&self, auth: &BedrockAuth) -> CredentialResult<Credential> {
        match auth {
            BedrockAuth::Standard {
                access_key_id,
                secret_access_key,
                session_token,
            } => resolve_standard(access_key_id, secret_access_key, session_token.as_deref()),
            BedrockAuth::ApiKey(key) => {
                let key = key.expose().trim();
                if let Some(encoded) = key.strip_prefix(EXCHANGE_PREFIX) {
                    self.resolve_exchange(encoded).await
                } else {
                    resolve_literal(key)
                }
            }
        }
    }

    /// Drop any cached exchanged credential.
    pub fn clear_cache(&self) {
        *self.cached.lock().unwrap() = None;
    }

    async fn resolve_exchange(&self, encoded: &str) -> CredentialResult<Credential> {
        let now = Utc::now();
        if let Some(cached) = self.cached.lock().unwrap().as_ref() {
            if cached.is_fresh(now) {
                debug!("reusing cached exchanged credential");
                return Ok(cached.clone());
            }
        }

        let endpoint = decode_endpoint(encoded)?;
        info!("exchanging pre-signed credential endpoint");
        let credential = self.fetch_exchange(&endpoint).await?;

        *self.cached.lock().unwrap() = Some(credential.clone());
        Ok(credential)
    }

    /// Fetch the pre-signed endpoint, first directly, then through the
    /// same proxy hosts the content fetcher uses. First well-formed JSON
    /// response wins; there is no content-length heuristic here.
    async fn fetch_exchange(&self, endpoint: &str) -> CredentialResult<Credential> {
        let encoded_target: String =
            url::form_urlencoded::byte_serialize(endpoint.as_bytes()).collect();
        let attempts = [
            endpoint.to_string(),
            format!("https://api.allorigins.win/raw?url={encoded_target}"),
            format!("https://corsproxy.io/?url={encoded_target}"),
        ];

        let mut last_reason = String::new();
        for request_url in &attempts {
            match self.client.get(request_url).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<ExchangeResponse>().await {
                        Ok(payload) => return payload.into_credential(),
                        Err(e) => {
                            warn!(error = %e, "exchange response was not usable JSON");
                            last_reason = e.to_string();
                        }
                    }
                }
                Ok(response) => {
                    warn!(status = %response.status(), "exchange endpoint returned error status");
                    last_reason = format!("HTTP {}", response.status());
                }
                Err(e) => {
                    warn!(error = %e, "exchange request failed");
                    last_reason = e.to_string();
                }
            }
        }

        Err(CredentialError::KeyExchangeInvalid {
            reason: last_reason,
        })
    }
}

fn resolve_standard(
    access_key_id: &str,
    secret_access_key: &SecretString,
    session_token: Option<&str>,
) -> CredentialResult<Credential> {
    let access_key_id = access_key_id.trim();
    let secret_access_key = secret_access_key.expose().trim();

    if access_key_id.is_empty() || secret_access_key.is_empty() {
        return Err(CredentialError::MissingCredentials);
    }

    Ok(Credential {
        access_key_id: access_key_id.to_string(),
        secret_access_key: secret_access_key.to_string(),
        session_token: session_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        expiration: None,
    })
}

/// Decode the base64 endpoint payload and default the scheme to https.
fn decode_endpoint(encoded: &str) -> CredentialResult<String> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| CredentialError::KeyExchangeInvalid {
            reason: format!("endpoint is not valid base64: {e}"),
        })?;

    let url = String::from_utf8(bytes).map_err(|_| CredentialError::KeyExchangeInvalid {
        reason: "decoded endpoint is not UTF-8".to_string(),
    })?;

    let url = url.trim().to_string();
    if url.contains("://") {
        Ok(url)
    } else {
        Ok(format!("https://{url}"))
    }
}

/// Exchange payload. Field names vary by issuer: snake/camel case or
/// capitalized (STS-style).
#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(alias = "accessKeyId", alias = "AccessKeyId")]
    access_key_id: Option<String>,
    #[serde(alias = "secretAccessKey", alias = "SecretAccessKey")]
    secret_access_key: Option<String>,
    #[serde(alias = "sessionToken", alias = "SessionToken", alias = "Token")]
    session_token: Option<String>,
    #[serde(alias = "Expiration")]
    expiration: Option<DateTime<Utc>>,
}

impl ExchangeResponse {
    fn into_credential(self) -> CredentialResult<Credential> {
        let access_key_id = self.access_key_id.unwrap_or_default();
        let secret_access_key = self.secret_access_key.unwrap_or_default();
        let session_token = self.session_token.unwrap_or_default();

        if access_key_id.is_empty() || secret_access_key.is_empty() || session_token.is_empty() {
            return Err(CredentialError::KeyExchangeInvalid {
                reason: "exchange response missing credential fields".to_string(),
            });
        }

        Ok(Credential {
            access_key_id,
            secret_access_key,
            session_token: Some(session_token),
            expiration: Some(self.expiration.unwrap_or_else(|| Utc::now() + DEFAULT_VALIDITY)),
        })
    }
}

/// Literal credential JSON shape.
#[derive(Debug, Deserialize)]
struct LiteralJson {
    #[serde(alias = "accessKeyId")]
    access_key_id: Option<String>,
    #[serde(alias = "secretAccessKey")]
    secret_access_key: Option<String>,
    #[serde(alias = "sessionToken")]
    session_token: Option<String>,
}

/// Parse a literal (non-exchange) credential string. Tries, in order:
/// JSON object, base64-wrapped colon-delimited, raw colon-delimited.
fn resolve_literal(key: &str) -> CredentialResult<Credential> {
    if let Ok(json) = serde_json::from_str::<LiteralJson>(key) {
        if let (Some(access), Some(secret)) = (json.access_key_id, json.secret_access_key) {
            return validate_literal(access, secret, json.session_token);
        }
    }

    if let Ok(bytes) = BASE64.decode(key) {
        if let Ok(decoded) = String::from_utf8(bytes) {
            if decoded.contains(':') {
                return parse_colon_delimited(&decoded);
            }
        }
    }

    if key.contains(':') {
        return parse_colon_delimited(key);
    }

    Err(CredentialError::InvalidCredentialFormat {
        reason: "expected JSON, base64 colon-delimited, or colon-delimited credentials".to_string(),
    })
}

fn parse_colon_delimited(s: &str) -> CredentialResult<Credential> {
    let mut parts = s.splitn(3, ':');
    let access = parts.next().unwrap_or_default().trim().to_string();
    let secret = parts.next().unwrap_or_default().trim().to_string();
    let session = parts.next().map(str::trim).map(str::to_string);

    validate_literal(access, secret, session.filter(|t| !t.is_empty()))
}

fn validate_literal(
    access: String,
    secret: String,
    session: Option<String>,
) -> CredentialResult<Credential> {
    if access.len() < MIN_ACCESS_KEY_LEN || secret.len() <= MIN_SECRET_LEN {
        return Err(CredentialError::InvalidCredentialFormat {
            reason: "credential tokens are implausibly short".to_string(),
        });
    }

    Ok(Credential {
        access_key_id: access,
        secret_access_key: secret,
        session_token: session,
        expiration: None,
    })
}
