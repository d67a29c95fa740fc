//! Access tokens for the Firestore REST API.
//!
//! # Architecture
//!
//! ```text
//! TokenSource (trait)
//!     |
//!     +-- StaticToken
//!     |       Fixed bearer token; the emulator accepts "owner".
//!     |
//!     +-- ServiceAccountTokenSource
//!             Signs an RS256 assertion with the service-account key and
//!             exchanges it at the key's token endpoint (OAuth 2.0 JWT
//!             bearer grant). The token is cached until shortly before it
//!             expires.
//! ```
//!
//! Private keys and access tokens are held as `SecretString` so they never
//! show up in `Debug` output or logs.

use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// OAuth scope granting read/write access to Firestore.
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Token endpoint used when the key does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Bearer token accepted by the Firestore emulator.
pub const EMULATOR_TOKEN: &str = "owner";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Supplies the bearer token attached to every store request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, StoreError>;
}

/// A token that never changes.
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self(SecretString::from(token.to_string()))
    }

    pub fn emulator() -> Self {
        Self::new(EMULATOR_TOKEN)
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<SecretString, StoreError> {
        Ok(self.0.clone())
    }
}

/// The fields of a Google service-account JSON key that token minting needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    private_key: SecretString,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse the key from its JSON text, as downloaded from the console.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let key: Self =
            serde_json::from_str(json).map_err(|e| StoreError::Credentials(e.to_string()))?;
        if key.project_id.is_empty() || key.client_email.is_empty() {
            return Err(StoreError::Credentials(
                "project_id and client_email must be set".to_string(),
            ));
        }
        Ok(key)
    }

    /// Sign a JWT assertion valid for one hour from `now` (seconds since epoch).
    pub fn sign_assertion(&self, now: u64) -> Result<String, StoreError> {
        #[derive(Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: u64,
            exp: u64,
        }

        let claims = Claims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|e| StoreError::Credentials(e.to_string()))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| StoreError::Credentials(e.to_string()))
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// Token endpoint request for a signed assertion.
pub fn build_token_request(token_uri: &str, assertion: &str) -> HttpRequest {
    let form = format!(
        "grant_type={}&assertion={}",
        urlencoding::encode(JWT_BEARER_GRANT),
        urlencoding::encode(assertion)
    );
    HttpRequest::new(HttpMethod::Post, token_uri.to_string()).with_form(form)
}

/// A minted access token and its lifetime.
#[derive(Debug, Clone)]
pub struct GrantedToken {
    pub access_token: SecretString,
    pub expires_in: Duration,
}

pub fn parse_token_response(response: HttpResponse) -> Result<GrantedToken, StoreError> {
    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
        #[serde(default = "default_expires_in")]
        expires_in: u64,
    }

    fn default_expires_in() -> u64 {
        ASSERTION_LIFETIME_SECS
    }

    if !response.is_success() {
        return Err(StoreError::Auth(format!(
            "token endpoint returned HTTP {}: {}",
            response.status, response.body
        )));
    }
    let parsed: TokenResponse =
        serde_json::from_str(&response.body).map_err(|e| StoreError::Auth(e.to_string()))?;
    Ok(GrantedToken {
        access_token: SecretString::from(parsed.access_token),
        expires_in: Duration::from_secs(parsed.expires_in),
    })
}

struct CachedToken {
    token: SecretString,
    refresh_at: Instant,
}

/// Mints and caches access tokens for a service account.
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Self {
        Self {
            key,
            http,
            cached: Mutex::new(None),
        }
    }

    async fn mint(&self) -> Result<GrantedToken, StoreError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StoreError::Auth(e.to_string()))?
            .as_secs();
        let assertion = self.key.sign_assertion(now)?;
        let request = build_token_request(&self.key.token_uri, &assertion);
        let response = crate::firestore::execute(&self.http, request, None).await?;
        parse_token_response(response)
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<SecretString, StoreError> {
        // Holding the lock while minting keeps concurrent requests from
        // each minting their own token.
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if Instant::now() < entry.refresh_at {
                return Ok(entry.token.clone());
            }
        }

        let granted = self.mint().await?;
        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in_secs = granted.expires_in.as_secs(),
            "minted Firestore access token"
        );
        let refresh_at = Instant::now() + granted.expires_in.saturating_sub(REFRESH_MARGIN);
        *cached = Some(CachedToken {
            token: granted.access_token.clone(),
            refresh_at,
        });
        Ok(granted.access_token)
    }
}
