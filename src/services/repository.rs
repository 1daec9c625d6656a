//! Per-collection data access facade.
//!
//! Composes the TTL caches, the retry executor, schema validation and the
//! access-policy hook around a [`RemoteStore`]. This is the only layer that
//! populates and invalidates caches, so read-after-write consistency holds
//! across its operations: every successful mutation drops every list/query
//! entry for the collection and, where applicable, the mutated item's entry.
//!
//! Reads degrade gracefully: a record failing validation is logged and
//! filtered (lists) or reported as absent (point lookups). Writes fail
//! fast, with validation running before any network call is issued.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::errors::{DataAccessError, DataResult, Operation, RemoteStoreError};
use crate::domain::models::{QuerySpec, RawDocument, Record, Schema, ValidationOutcome};
use crate::domain::ports::{AccessPolicy, AllowAll, RemoteStore};
use crate::infrastructure::cache::{TtlCache, DEFAULT_TTL};
use crate::infrastructure::registry::{self, Invalidate};
use crate::infrastructure::retry::{RetryExecutor, RetryPolicy};

/// Cache key for the unfiltered collection listing.
const ALL_KEY: &str = "all";

/// Placeholder id injected when validating create candidates before the
/// store has generated a real one.
const PLACEHOLDER_ID: &str = "__pending__";

/// Cached, retrying, validating facade over one collection.
///
/// Each instance owns its caches and retry state; construct one per entity
/// type. Concurrent cache misses on the same key are not coalesced; each
/// issues its own fetch.
pub struct Repository<T> {
    collection: String,
    store: Arc<dyn RemoteStore>,
    policy: Arc<dyn AccessPolicy>,
    schema: Option<Schema>,
    retry: RetryExecutor,
    list_cache: Arc<TtlCache<Vec<Record<T>>>>,
    item_cache: Arc<TtlCache<Record<T>>>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Repository with the default cache TTL (5 minutes) and retry policy.
    pub fn new(collection: impl Into<String>, store: Arc<dyn RemoteStore>) -> Self {
        Self::with_ttl(collection, store, DEFAULT_TTL)
    }

    /// Repository with a custom cache TTL.
    pub fn with_ttl(
        collection: impl Into<String>,
        store: Arc<dyn RemoteStore>,
        ttl: Duration,
    ) -> Self {
        let collection = collection.into();
        let list_cache = Arc::new(TtlCache::new(ttl));
        let item_cache = Arc::new(TtlCache::new(ttl));

        let list_handle: Arc<dyn Invalidate> = list_cache.clone();
        let item_handle: Arc<dyn Invalidate> = item_cache.clone();
        registry::register(&collection, Arc::downgrade(&list_handle));
        registry::register(&collection, Arc::downgrade(&item_handle));

        Self {
            collection,
            store,
            policy: Arc::new(AllowAll),
            schema: None,
            retry: RetryExecutor::default(),
            list_cache,
            item_cache,
        }
    }

    /// Register a schema. From here on reads are filtered and writes are
    /// blocked on validation failures.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Register an external permission-check hook.
    pub fn with_access_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Drop every cached list and item for this repository.
    pub fn clear_cache(&self) {
        self.list_cache.clear();
        self.item_cache.clear();
    }

    /// Full collection listing.
    pub async fn get_all(&self, use_cache: bool) -> DataResult<Vec<Record<T>>> {
        self.authorize(Operation::GetAll).await?;

        if use_cache {
            if let Some(cached) = self.list_cache.get(ALL_KEY) {
                debug!(collection = %self.collection, "returning cached collection listing");
                return Ok(cached);
            }
        }

        let raw = self
            .retry
            .execute(Operation::GetAll.as_str(), || {
                let store = Arc::clone(&self.store);
                let collection = self.collection.clone();
                async move { store.fetch_all(&collection).await }
            })
            .await
            .map_err(|err| DataAccessError::remote(Operation::GetAll, &self.collection, err))?;

        let records = self.admit_list(Operation::GetAll, &raw);
        self.list_cache.insert(ALL_KEY, records.clone());
        Ok(records)
    }

    /// Point lookup. `Ok(None)` covers both a true absence and a stored
    /// record that failed validation; the latter is logged.
    pub async fn get_by_id(&self, id: &str, use_cache: bool) -> DataResult<Option<Record<T>>> {
        self.authorize(Operation::GetById).await?;

        if use_cache {
            if let Some(cached) = self.item_cache.get(id) {
                debug!(collection = %self.collection, id, "returning cached item");
                return Ok(Some(cached));
            }
        }

        let raw = self
            .retry
            .execute(Operation::GetById.as_str(), || {
                let store = Arc::clone(&self.store);
                let collection = self.collection.clone();
                let id = id.to_string();
                async move { store.fetch_by_id(&collection, &id).await }
            })
            .await
            .map_err(|err| DataAccessError::remote(Operation::GetById, &self.collection, err))?;

        let Some(doc) = raw else {
            return Ok(None);
        };
        let Some(record) = self.admit(Operation::GetById, &doc) else {
            return Ok(None);
        };

        self.item_cache.insert(&doc.id, record.clone());
        Ok(Some(record))
    }

    /// Insert a new document and return its generated id.
    ///
    /// Validation (with a placeholder id) runs before any network call; a
    /// failure has zero side effects.
    pub async fn create(&self, data: &T) -> DataResult<String> {
        self.authorize(Operation::Create).await?;

        let fields = serde_json::to_value(data).map_err(|err| {
            DataAccessError::remote(
                Operation::Create,
                &self.collection,
                RemoteStoreError::Serialization(err),
            )
        })?;

        let mut candidate = fields.clone();
        if let Value::Object(ref mut map) = candidate {
            map.insert(
                "id".to_string(),
                Value::String(PLACEHOLDER_ID.to_string()),
            );
        }
        if let ValidationOutcome::Invalid(errors) = self.validate(&candidate) {
            return Err(DataAccessError::validation(
                Operation::Create,
                &self.collection,
                errors,
            ));
        }

        let id = self
            .retry
            .execute(Operation::Create.as_str(), || {
                let store = Arc::clone(&self.store);
                let collection = self.collection.clone();
                let fields = fields.clone();
                async move { store.insert(&collection, fields).await }
            })
            .await
            .map_err(|err| DataAccessError::remote(Operation::Create, &self.collection, err))?;

        self.list_cache.clear();
        debug!(collection = %self.collection, id = %id, "created document");
        Ok(id)
    }

    /// Partial update (top-level field overlay).
    ///
    /// With a schema registered, the authoritative current value is fetched
    /// bypassing the cache, the partial is overlaid, and the merged object
    /// must validate before any write is issued. The written payload carries
    /// a refreshed `updated_at`.
    pub async fn update(&self, id: &str, partial: Value) -> DataResult<()> {
        self.authorize(Operation::Update).await?;

        let Value::Object(mut payload) = partial else {
            return Err(DataAccessError::validation(
                Operation::Update,
                &self.collection,
                vec!["(root): partial update must be an object".to_string()],
            ));
        };

        if self.schema.is_some() {
            let current = self
                .retry
                .execute(Operation::Update.as_str(), || {
                    let store = Arc::clone(&self.store);
                    let collection = self.collection.clone();
                    let id = id.to_string();
                    async move { store.fetch_by_id(&collection, &id).await }
                })
                .await
                .map_err(|err| {
                    DataAccessError::remote(Operation::Update, &self.collection, err)
                })?;

            let Some(current) = current else {
                return Err(DataAccessError::message(
                    Operation::Update,
                    &self.collection,
                    format!("document '{id}' does not exist"),
                ));
            };

            let mut merged = current.merged();
            if let Value::Object(ref mut map) = merged {
                for (key, value) in &payload {
                    map.insert(key.clone(), value.clone());
                }
            }
            if let ValidationOutcome::Invalid(errors) = self.validate(&merged) {
                return Err(DataAccessError::validation(
                    Operation::Update,
                    &self.collection,
                    errors,
                ));
            }
        }

        payload.insert(
            "updated_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        self.retry
            .execute(Operation::Update.as_str(), || {
                let store = Arc::clone(&self.store);
                let collection = self.collection.clone();
                let id = id.to_string();
                let payload = Value::Object(payload.clone());
                async move { store.patch(&collection, &id, payload).await }
            })
            .await
            .map_err(|err| DataAccessError::remote(Operation::Update, &self.collection, err))?;

        self.item_cache.remove(id);
        self.list_cache.clear();
        debug!(collection = %self.collection, id, "updated document");
        Ok(())
    }

    /// Remove a document.
    pub async fn delete(&self, id: &str) -> DataResult<()> {
        self.authorize(Operation::Delete).await?;

        self.retry
            .execute(Operation::Delete.as_str(), || {
                let store = Arc::clone(&self.store);
                let collection = self.collection.clone();
                let id = id.to_string();
                async move { store.remove(&collection, &id).await }
            })
            .await
            .map_err(|err| DataAccessError::remote(Operation::Delete, &self.collection, err))?;

        self.item_cache.remove(id);
        self.list_cache.clear();
        debug!(collection = %self.collection, id, "deleted document");
        Ok(())
    }

    /// Filtered, ordered, bounded listing. Semantically identical specs
    /// share one cache slot via the canonical cache key.
    pub async fn query(&self, spec: &QuerySpec, use_cache: bool) -> DataResult<Vec<Record<T>>> {
        self.authorize(Operation::Query).await?;

        let key = spec.cache_key();
        if use_cache {
            if let Some(cached) = self.list_cache.get(&key) {
                debug!(collection = %self.collection, key = %key, "returning cached query result");
                return Ok(cached);
            }
        }

        let raw = self
            .retry
            .execute(Operation::Query.as_str(), || {
                let store = Arc::clone(&self.store);
                let collection = self.collection.clone();
                let spec = spec.clone();
                async move { store.fetch_filtered(&collection, &spec).await }
            })
            .await
            .map_err(|err| DataAccessError::remote(Operation::Query, &self.collection, err))?;

        let records = self.admit_list(Operation::Query, &raw);
        self.list_cache.insert(key, records.clone());
        Ok(records)
    }

    async fn authorize(&self, operation: Operation) -> DataResult<()> {
        self.policy
            .check(&self.collection, operation)
            .await
            .map_err(|err| DataAccessError::remote(operation, &self.collection, err))
    }

    fn validate(&self, candidate: &Value) -> ValidationOutcome {
        match &self.schema {
            Some(schema) => schema.validate(candidate),
            None => ValidationOutcome::Valid,
        }
    }

    /// Validate and deserialize one raw document; `None` means it must be
    /// treated as absent.
    fn admit(&self, operation: Operation, doc: &RawDocument) -> Option<Record<T>> {
        if let ValidationOutcome::Invalid(errors) = self.validate(&doc.merged()) {
            warn!(
                collection = %self.collection,
                operation = %operation,
                id = %doc.id,
                violations = ?errors,
                "dropping document that failed validation"
            );
            return None;
        }

        match serde_json::from_value::<T>(doc.fields.clone()) {
            Ok(data) => Some(Record::new(doc.id.clone(), data)),
            Err(err) => {
                warn!(
                    collection = %self.collection,
                    operation = %operation,
                    id = %doc.id,
                    error = %err,
                    "dropping document that failed deserialization"
                );
                None
            }
        }
    }

    fn admit_list(&self, operation: Operation, raw: &[RawDocument]) -> Vec<Record<T>> {
        raw.iter()
            .filter_map(|doc| self.admit(operation, doc))
            .collect()
    }
}
