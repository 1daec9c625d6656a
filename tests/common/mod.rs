//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use docvault::{
    AccessPolicy, FieldRule, FieldType, InMemoryRemoteStore, Operation, QuerySpec, RawDocument,
    RemoteStore, RemoteStoreError, Schema,
};

/// Test entity: a sensor gauge with an allowed reading range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub name: String,
    pub low: i64,
    pub high: i64,
}

pub fn gauge(name: &str, low: i64, high: i64) -> Gauge {
    Gauge {
        name: name.to_string(),
        low,
        high,
    }
}

pub fn gauge_fields(name: &str, low: i64, high: i64) -> Value {
    json!({"name": name, "low": low, "high": high})
}

/// Schema for [`Gauge`]: typed fields plus a cross-field range check.
pub fn gauge_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("id", FieldType::String).required())
        .field(FieldRule::new("name", FieldType::String).required().non_empty())
        .field(FieldRule::new("low", FieldType::Integer).required())
        .field(FieldRule::new("high", FieldType::Integer).required())
        .check("high", "must be >= low", |doc| {
            match (
                doc.get("low").and_then(Value::as_i64),
                doc.get("high").and_then(Value::as_i64),
            ) {
                (Some(low), Some(high)) => high >= low,
                _ => true,
            }
        })
}

/// In-memory store instrumented with per-method call counters.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryRemoteStore,
    pub fetch_all_calls: AtomicUsize,
    pub fetch_by_id_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub patch_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_all_count(&self) -> usize {
        self.fetch_all_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_by_id_count(&self) -> usize {
        self.fetch_by_id_calls.load(Ordering::SeqCst)
    }

    pub fn insert_count(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn patch_count(&self) -> usize {
        self.patch_calls.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    pub fn query_count(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for CountingStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RawDocument>, RemoteStoreError> {
        self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_all(collection).await
    }

    async fn fetch_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<RawDocument>, RemoteStoreError> {
        self.fetch_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_by_id(collection, id).await
    }

    async fn insert(&self, collection: &str, fields: Value) -> Result<String, RemoteStoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(collection, fields).await
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> Result<(), RemoteStoreError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.patch(collection, id, partial).await
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), RemoteStoreError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(collection, id).await
    }

    async fn fetch_filtered(
        &self,
        collection: &str,
        spec: &QuerySpec,
    ) -> Result<Vec<RawDocument>, RemoteStoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_filtered(collection, spec).await
    }
}

/// Store in which every call fails, transiently or permanently.
pub struct FailingStore {
    pub transient: bool,
    pub calls: AtomicUsize,
}

impl FailingStore {
    pub fn transient() -> Self {
        Self {
            transient: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn permanent() -> Self {
        Self {
            transient: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, RemoteStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.transient {
            Err(RemoteStoreError::Transient("store unreachable".to_string()))
        } else {
            Err(RemoteStoreError::InvalidResponse(
                "store returned garbage".to_string(),
            ))
        }
    }
}

#[async_trait]
impl RemoteStore for FailingStore {
    async fn fetch_all(&self, _collection: &str) -> Result<Vec<RawDocument>, RemoteStoreError> {
        self.fail()
    }

    async fn fetch_by_id(
        &self,
        _collection: &str,
        _id: &str,
    ) -> Result<Option<RawDocument>, RemoteStoreError> {
        self.fail()
    }

    async fn insert(&self, _collection: &str, _fields: Value) -> Result<String, RemoteStoreError> {
        self.fail()
    }

    async fn patch(
        &self,
        _collection: &str,
        _id: &str,
        _partial: Value,
    ) -> Result<(), RemoteStoreError> {
        self.fail()
    }

    async fn remove(&self, _collection: &str, _id: &str) -> Result<(), RemoteStoreError> {
        self.fail()
    }

    async fn fetch_filtered(
        &self,
        _collection: &str,
        _spec: &QuerySpec,
    ) -> Result<Vec<RawDocument>, RemoteStoreError> {
        self.fail()
    }
}

/// Tracing layer counting warn-level events, for asserting that dropped
/// records are reported.
#[derive(Clone, Default)]
pub struct WarnCounter {
    warns: Arc<AtomicUsize>,
}

impl WarnCounter {
    pub fn warn_count(&self) -> usize {
        self.warns.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.warns.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Access policy denying every mutation while allowing reads.
pub struct DenyWrites;

#[async_trait]
impl AccessPolicy for DenyWrites {
    async fn check(&self, collection: &str, operation: Operation) -> Result<(), RemoteStoreError> {
        match operation {
            Operation::Create | Operation::Update | Operation::Delete => {
                Err(RemoteStoreError::PermissionDenied(format!(
                    "writes to '{collection}' are not allowed"
                )))
            }
            _ => Ok(()),
        }
    }
}
