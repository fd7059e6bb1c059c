//! Service account authentication for the Sheets API.
//!
//! Access tokens are minted lazily on first use with an RS256 JWT-bearer
//! grant, cached until shortly before expiry, and dropped explicitly when the
//! store reports an auth failure.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AuthError, ConfigError};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_TTL_SECS: i64 = 3600;
/// Tokens this close to expiry are treated as expired.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Supplies bearer tokens for the log store.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Current token, minting one if none is cached.
    async fn token(&self) -> Result<SecretString, AuthError>;

    /// Forget the cached token so the next call mints a new one.
    async fn invalidate(&self);
}

/// The subset of a Google service account key file the bot uses.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    #[serde(deserialize_with = "deserialize_secret_string")]
    pub private_key: SecretString,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn deserialize_secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(SecretString::from(s))
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Load and check a key file. Any failure here is a startup error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let credentials_error = |reason: String| ConfigError::Credentials {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| credentials_error(e.to_string()))?;
        let key: ServiceAccountKey =
            serde_json::from_str(&raw).map_err(|e| credentials_error(e.to_string()))?;
        key.encoding_key()
            .map_err(|e| credentials_error(format!("invalid private key: {}", e)))?;
        Ok(key)
    }

    fn encoding_key(&self) -> Result<EncodingKey, jsonwebtoken::errors::Error> {
        EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
    }

    /// Signed JWT asserting this account for the Sheets scope.
    pub fn assertion(&self) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key()?,
        )?)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(deserialize_with = "deserialize_secret_string")]
    access_token: SecretString,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: SecretString,
    obtained_at: Instant,
    expires_in: Duration,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        self.obtained_at.elapsed() + EXPIRY_BUFFER > self.expires_in
    }
}

/// Process-scoped token cache for one service account.
pub struct ServiceAccountTokens {
    key: ServiceAccountKey,
    client: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            client: reqwest::Client::new(),
            cache: Mutex::new(None),
        }
    }

    async fn mint(&self) -> Result<CachedToken, AuthError> {
        let assertion = self.key.assertion()?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Minted Sheets access token"
        );
        Ok(CachedToken {
            token: token.access_token,
            obtained_at: Instant::now(),
            expires_in: Duration::from_secs(token.expires_in),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountTokens {
    async fn token(&self) -> Result<SecretString, AuthError> {
        // Held across the mint so concurrent appends share one grant.
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref()
            && !cached.is_expired()
        {
            return Ok(cached.token.clone());
        }
        let fresh = self.mint().await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    async fn invalidate(&self) {
        if self.cache.lock().await.take().is_some() {
            tracing::info!(client_email = %self.key.client_email, "Dropped cached Sheets token");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_cached_token_expiry_buffer() {
        let fresh = CachedToken {
            token: SecretString::from("t".to_string()),
            obtained_at: Instant::now(),
            expires_in: Duration::from_secs(3600),
        };
        assert!(!fresh.is_expired());

        let nearly = CachedToken {
            token: SecretString::from("t".to_string()),
            obtained_at: Instant::now(),
            expires_in: Duration::from_secs(30),
        };
        assert!(nearly.is_expired());
    }

    #[test]
    fn test_missing_key_file_is_credentials_error() {
        let err = ServiceAccountKey::from_file(Path::new("/nonexistent/key.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Credentials { .. }));
    }

    #[test]
    fn test_invalid_private_key_rejected_at_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"client_email":"bot@example.iam.gserviceaccount.com","private_key":"not a pem"}}"#
        )
        .unwrap();
        let err = ServiceAccountKey::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid private key"));
    }

    #[test]
    fn test_key_debug_redacts_private_key() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"client_email":"bot@example.com","private_key":"-----BEGIN SECRET"}"#,
        )
        .unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains("BEGIN SECRET"));
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    }

    #[tokio::test]
    async fn test_invalidate_without_token_is_noop() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"client_email":"bot@example.com","private_key":"x"}"#,
        )
        .unwrap();
        let tokens = ServiceAccountTokens::new(key);
        tokens.invalidate().await;
        assert!(tokens.cache.lock().await.is_none());
    }
}
