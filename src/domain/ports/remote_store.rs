//! Port over a remote, schemaless document store.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::RemoteStoreError;
use crate::domain::models::{QuerySpec, RawDocument};

/// Remote document store abstraction.
///
/// Collections hold schemaless JSON documents addressed by generated string
/// ids. Implementations are expected to stamp `created_at`/`updated_at` on
/// writes when the caller does not supply them. Wire protocol and
/// authentication are adapter concerns.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every document in the collection.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RawDocument>, RemoteStoreError>;

    /// Point lookup. `Ok(None)` when the id does not exist.
    async fn fetch_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<RawDocument>, RemoteStoreError>;

    /// Insert a document and return its generated id.
    async fn insert(&self, collection: &str, fields: Value) -> Result<String, RemoteStoreError>;

    /// Apply a partial update (top-level field overlay) to the identified
    /// document.
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> Result<(), RemoteStoreError>;

    /// Remove the identified document. Removing an absent id is not an error.
    async fn remove(&self, collection: &str, id: &str) -> Result<(), RemoteStoreError>;

    /// Fetch the filtered, ordered, bounded view described by `spec`.
    async fn fetch_filtered(
        &self,
        collection: &str,
        spec: &QuerySpec,
    ) -> Result<Vec<RawDocument>, RemoteStoreError>;
}
