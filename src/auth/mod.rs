//! Service-account authentication against Google APIs.
//!
//! The key file is read once at startup. Access tokens are minted from it on demand
//! and cached by [`TokenSource`].

mod token;

pub use token::*;

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::errors::AppError;

pub const SERVICE_ACCOUNT_TYPE: &str = "service_account";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Google service-account key as downloaded from the cloud console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Read and validate a key file.
    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Credential(format!(
                "Failed to read service-account key {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    /// Parse and validate key JSON.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let key: ServiceAccountKey = serde_json::from_str(raw)
            .map_err(|e| AppError::Credential(format!("Malformed service-account key: {}", e)))?;

        if key.key_type != SERVICE_ACCOUNT_TYPE {
            return Err(AppError::Credential(format!(
                "Unsupported credential type '{}', expected '{}'",
                key.key_type, SERVICE_ACCOUNT_TYPE
            )));
        }
        if key.project_id.trim().is_empty() {
            return Err(AppError::Credential("project_id is empty".to_string()));
        }
        if key.client_email.trim().is_empty() {
            return Err(AppError::Credential("client_email is empty".to_string()));
        }

        Ok(key)
    }
}

// Keeps the private key out of logs.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}
