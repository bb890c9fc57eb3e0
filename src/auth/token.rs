//! OAuth2 access tokens for the database service.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::ServiceAccountKey;
use crate::errors::AppError;

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Token the Firestore emulator accepts in place of a real one.
pub const EMULATOR_TOKEN: &str = "owner";

const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Source of bearer tokens for outgoing database requests.
pub enum TokenSource {
    /// Fixed token, used against the emulator
    Static(String),
    /// Tokens exchanged from a signed service-account assertion
    ServiceAccount {
        key: ServiceAccountKey,
        signer: EncodingKey,
        http: reqwest::Client,
        cache: RwLock<Option<CachedToken>>,
    },
}

impl TokenSource {
    pub fn emulator() -> Self {
        TokenSource::Static(EMULATOR_TOKEN.to_string())
    }

    /// Build a token source from a service-account key. Fails if the private key is not RSA PEM.
    pub fn service_account(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self, AppError> {
        let signer = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(TokenSource::ServiceAccount {
            key,
            signer,
            http,
            cache: RwLock::new(None),
        })
    }

    /// Current bearer token, refreshed when it is close to expiry.
    pub async fn bearer(&self) -> Result<String, AppError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount {
                key,
                signer,
                http,
                cache,
            } => {
                if let Some(token) = cache.read().await.as_ref() {
                    if token.is_fresh(Utc::now()) {
                        return Ok(token.value.clone());
                    }
                }

                let mut slot = cache.write().await;
                // Another request may have refreshed while we waited for the lock.
                if let Some(token) = slot.as_ref() {
                    if token.is_fresh(Utc::now()) {
                        return Ok(token.value.clone());
                    }
                }

                let token = exchange(key, signer, http).await?;
                let value = token.value.clone();
                *slot = Some(token);
                Ok(value)
            }
        }
    }
}

/// Sign a JWT assertion for `key`.
fn sign_assertion(
    key: &ServiceAccountKey,
    signer: &EncodingKey,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: DATASTORE_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.private_key_id.clone());

    Ok(encode(&header, &claims, signer)?)
}

async fn exchange(
    key: &ServiceAccountKey,
    signer: &EncodingKey,
    http: &reqwest::Client,
) -> Result<CachedToken, AppError> {
    let now = Utc::now();
    let assertion = sign_assertion(key, signer, now)?;

    tracing::debug!("Exchanging service-account assertion at {}", key.token_uri);

    let resp = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| AppError::Auth(format!("Token endpoint unreachable: {}", e)))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{}: {}", err.error, description),
                None => err.error,
            },
            Err(_) => body,
        };
        return Err(AppError::Auth(format!(
            "Token exchange rejected ({}): {}",
            status, detail
        )));
    }

    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| AppError::Auth(format!("Malformed token response: {}", e)))?;

    Ok(CachedToken {
        value: token.access_token,
        expires_at: expiry(now, token.expires_in)?,
    })
}

/// Absolute expiry of a token issued at `now` with `expires_in` seconds of lifetime.
fn expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| AppError::Auth(format!("Token expires_in out of range: {}", expires_in)))
}
