//! Cloud Firestore over its REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::value::FirestoreDocument;
use super::DocumentStore;
use crate::auth::{ServiceAccountKey, TokenSource};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{OrderedQuery, Record};

pub const DEFAULT_DATABASE: &str = "(default)";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest<'a> {
    structured_query: StructuredQuery<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredQuery<'a> {
    from: Vec<CollectionSelector<'a>>,
    order_by: Vec<Order<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector<'a> {
    collection_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference<'a> {
    field_path: &'a str,
}

#[derive(Debug, Serialize)]
struct Order<'a> {
    field: FieldReference<'a>,
    direction: &'static str,
}

impl<'a> RunQueryRequest<'a> {
    fn new(query: &'a OrderedQuery) -> Self {
        Self {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: &query.collection,
                }],
                order_by: vec![Order {
                    field: FieldReference {
                        field_path: &query.order_by,
                    },
                    direction: query.direction.as_str(),
                }],
            },
        }
    }
}

/// One element of the `runQuery` response stream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryResponse {
    #[serde(default)]
    document: Option<FirestoreDocument>,
    #[serde(default)]
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl std::fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.code, self.message)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: RpcStatus,
}

/// Pull a readable message out of an error body, which may be an object or a one-element stream.
fn error_detail(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.to_string();
    }
    if let Ok(mut stream) = serde_json::from_str::<Vec<ErrorEnvelope>>(body) {
        if !stream.is_empty() {
            return stream.swap_remove(0).error.to_string();
        }
    }
    body.to_string()
}

/// Firestore client for one project and database.
pub struct FirestoreStore {
    http: reqwest::Client,
    documents_url: String,
    tokens: TokenSource,
}

impl FirestoreStore {
    pub fn new(http: reqwest::Client, base_url: &str, project_id: &str, tokens: TokenSource) -> Self {
        let documents_url = format!(
            "{}/projects/{}/databases/{}/documents",
            base_url.trim_end_matches('/'),
            project_id,
            DEFAULT_DATABASE
        );
        Self {
            http,
            documents_url,
            tokens,
        }
    }

    /// Load the service-account key and authenticate.
    ///
    /// The first token exchange happens here, so a missing, malformed or revoked key
    /// fails startup instead of the first request.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let key = ServiceAccountKey::load(&config.credentials_path).await?;

        let http = reqwest::Client::builder()
            .timeout(config.query_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let (base_url, tokens) = match &config.emulator_host {
            Some(host) => {
                tracing::info!("Using Firestore emulator at {}", host);
                (format!("http://{}/v1", host), TokenSource::emulator())
            }
            None => (
                config.firestore_url.clone(),
                TokenSource::service_account(key.clone(), http.clone())?,
            ),
        };

        let store = Self::new(http, &base_url, &key.project_id, tokens);
        store.tokens.bearer().await?;

        tracing::info!(
            "Authenticated to project {} as {}",
            key.project_id,
            key.client_email
        );

        Ok(store)
    }

    pub fn run_query_url(&self) -> String {
        format!("{}:runQuery", self.documents_url)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list_ordered(&self, query: &OrderedQuery) -> Result<Vec<Record>, AppError> {
        let token = self.tokens.bearer().await?;

        let resp = self
            .http
            .post(self.run_query_url())
            .bearer_auth(token)
            .json(&RunQueryRequest::new(query))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(AppError::Database(format!(
                "Query on {} failed with {}: {}",
                query.collection,
                status,
                error_detail(&body)
            )));
        }

        let stream: Vec<RunQueryResponse> = serde_json::from_str(&body)
            .map_err(|e| AppError::Database(format!("Malformed runQuery response: {}", e)))?;

        let mut records = Vec::with_capacity(stream.len());
        for item in stream {
            if let Some(err) = item.error {
                return Err(AppError::Database(format!(
                    "Query on {} failed: {}",
                    query.collection, err
                )));
            }
            // Entries without a document only carry read progress.
            if let Some(document) = item.document {
                records.push(document.into_record()?);
            }
        }

        tracing::debug!(
            "Fetched {} records from {} ordered by {}",
            records.len(),
            query.collection,
            query.order_by
        );

        Ok(records)
    }
}
