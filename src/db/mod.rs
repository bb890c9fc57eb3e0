//! Document database access.
//!
//! Firestore is the source of truth for posts. Handlers only see the [`DocumentStore`] trait.

mod firestore;
#[cfg(test)]
mod memory;
pub mod value;

pub use firestore::*;
#[cfg(test)]
pub use memory::*;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{OrderedQuery, Record};

/// Read access to a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every record of `query.collection`, ordered by `query.order_by`.
    ///
    /// Records without the order field are not returned. An empty collection is `Ok(vec![])`.
    async fn list_ordered(&self, query: &OrderedQuery) -> Result<Vec<Record>, AppError>;
}
