//! Posts API endpoint.

use axum::{extract::State, Json};

use super::ApiResult;
use crate::errors::AppError;
use crate::models::{OrderedQuery, Payload, Record};
use crate::AppState;

/// GET /posts - List every post, newest first.
pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Vec<Payload>> {
    let query = OrderedQuery::descending(&state.config.collection, &state.config.order_field);

    let fetch = state.store.list_ordered(&query);
    let records = match tokio::time::timeout(state.config.query_timeout, fetch).await {
        Ok(result) => result.inspect_err(|e| match e {
            AppError::Timeout(_) => tracing::warn!("Listing {} timed out: {}", query.collection, e),
            _ => tracing::error!("Failed to list {}: {}", query.collection, e),
        })?,
        Err(_) => {
            tracing::warn!(
                "Listing {} exceeded {:?}",
                query.collection,
                state.config.query_timeout
            );
            return Err(AppError::Timeout(format!(
                "Query on {} did not complete within {}s",
                query.collection,
                state.config.query_timeout.as_secs_f64()
            )));
        }
    };

    Ok(Json(records.into_iter().map(Record::into_payload).collect()))
}
