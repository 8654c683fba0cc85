//! Access tokens for the Sheets API.
//!
//! Either a service-account key file (signed JWT exchanged at the key's token
//! endpoint) or a pre-issued bearer token.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("credentials file {path} could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("credentials file {path} is not a service-account key: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("jwt signing failed: {0}")]
    Jwt(String),
    #[error("token exchange failed: {0}")]
    Exchange(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| AuthError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AuthError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    fn signed_assertion(&self, now: u64) -> Result<String, AuthError> {
        #[derive(Debug, Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: u64,
            exp: u64,
        }

        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_READONLY_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|error| AuthError::Jwt(error.to_string()))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|error| AuthError::Jwt(error.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub enum TokenSource {
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl TokenSource {
    pub fn service_account(key: ServiceAccountKey) -> Self {
        TokenSource::ServiceAccount {
            key,
            cached: Mutex::new(None),
        }
    }

    /// Account the spreadsheet must be shared with, when known.
    pub fn principal(&self) -> Option<&str> {
        match self {
            TokenSource::Static(_) => None,
            TokenSource::ServiceAccount { key, .. } => Some(&key.client_email),
        }
    }

    pub fn access_token(&self, http: &reqwest::blocking::Client) -> Result<String, AuthError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount { key, cached } => {
                let mut cached = cached.lock();
                if let Some(token) = cached.as_ref() {
                    if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                        return Ok(token.value.clone());
                    }
                }
                let fresh = exchange(http, key)?;
                let value = fresh.value.clone();
                *cached = Some(fresh);
                Ok(value)
            }
        }
    }
}

fn exchange(
    http: &reqwest::blocking::Client,
    key: &ServiceAccountKey,
) -> Result<CachedToken, AuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|error| AuthError::Jwt(error.to_string()))?
        .as_secs();
    let assertion = key.signed_assertion(now)?;

    debug!(account = %key.client_email, "exchanging service-account assertion");
    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())])
        .send()
        .map_err(|error| AuthError::Exchange(error.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        return Err(AuthError::Exchange(format!("HTTP {status}: {body}")));
    }

    let token: TokenResponse = response
        .json()
        .map_err(|error| AuthError::Exchange(error.to_string()))?;
    let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
    Ok(CachedToken {
        value: token.access_token,
        expires_at: Instant::now() + lifetime,
    })
}
