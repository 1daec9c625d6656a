//! In-memory remote store for tests and embedded use.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::errors::RemoteStoreError;
use crate::domain::models::schema::lookup_path;
use crate::domain::models::{FieldFilter, FilterOp, QuerySpec, RawDocument, SortDirection};
use crate::domain::ports::RemoteStore;

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// Process-local [`RemoteStore`] keeping collections in memory.
///
/// Mirrors the store-side behavior the repository relies on: generated ids
/// and `created_at`/`updated_at` stamping on writes when the caller does not
/// supply them.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    collections: Mutex<Collections>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a document under a fixed id, bypassing stamping. Intended for
    /// test setup, including deliberately corrupt documents.
    pub fn seed(&self, collection: &str, id: &str, fields: Value) {
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn stamp_insert(map: &mut Map<String, Value>) {
    let now = Utc::now().to_rfc3339();
    map.entry("created_at".to_string())
        .or_insert_with(|| Value::String(now.clone()));
    map.entry("updated_at".to_string())
        .or_insert_with(|| Value::String(now));
}

fn matches_filter(fields: &Value, filter: &FieldFilter) -> bool {
    let value = lookup_path(fields, &filter.field);
    match filter.op {
        FilterOp::Eq => value == Some(&filter.value),
        FilterOp::Ne => value != Some(&filter.value),
        FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge => {
            let Some(value) = value else { return false };
            let Some(ord) = compare_json(value, &filter.value) else {
                return false;
            };
            match filter.op {
                FilterOp::Lt => ord == Ordering::Less,
                FilterOp::Le => ord != Ordering::Greater,
                FilterOp::Gt => ord == Ordering::Greater,
                FilterOp::Ge => ord != Ordering::Less,
                _ => unreachable!(),
            }
        }
        FilterOp::Contains => match value {
            Some(Value::Array(items)) => items.contains(&filter.value),
            Some(Value::String(text)) => filter
                .value
                .as_str()
                .is_some_and(|needle| text.contains(needle)),
            _ => false,
        },
        FilterOp::In => filter
            .value
            .as_array()
            .is_some_and(|options| value.is_some_and(|v| options.contains(v))),
    }
}

fn compare_json(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn apply_spec(docs: &mut Vec<RawDocument>, spec: &QuerySpec) {
    docs.retain(|doc| spec.filters.iter().all(|f| matches_filter(&doc.fields, f)));

    if let Some(ref field) = spec.order_by {
        docs.sort_by(|a, b| {
            match (
                lookup_path(&a.fields, field),
                lookup_path(&b.fields, field),
            ) {
                (Some(x), Some(y)) => {
                    let ord = compare_json(x, y).unwrap_or(Ordering::Equal);
                    match spec.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                }
                // documents missing the sort field go last either way
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }

    if let Some(limit) = spec.limit {
        docs.truncate(limit);
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<RawDocument>, RemoteStoreError> {
        Ok(self
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| RawDocument::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<RawDocument>, RemoteStoreError> {
        Ok(self
            .lock()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| RawDocument::new(id, fields.clone())))
    }

    async fn insert(
        &self,
        collection: &str,
        mut fields: Value,
    ) -> Result<String, RemoteStoreError> {
        let Value::Object(ref mut map) = fields else {
            return Err(RemoteStoreError::InvalidResponse(
                "document fields must be an object".to_string(),
            ));
        };
        stamp_insert(map);

        let id = Uuid::new_v4().to_string();
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> Result<(), RemoteStoreError> {
        let Value::Object(partial) = partial else {
            return Err(RemoteStoreError::InvalidResponse(
                "partial update must be an object".to_string(),
            ));
        };

        let mut collections = self.lock();
        let Some(existing) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Err(RemoteStoreError::InvalidResponse(format!(
                "no document '{id}' in collection '{collection}'"
            )));
        };

        let Value::Object(map) = existing else {
            return Err(RemoteStoreError::InvalidResponse(format!(
                "document '{id}' in collection '{collection}' is not an object"
            )));
        };
        for (key, value) in partial {
            map.insert(key, value);
        }
        map.entry("updated_at".to_string())
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), RemoteStoreError> {
        if let Some(docs) = self.lock().get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn fetch_filtered(
        &self,
        collection: &str,
        spec: &QuerySpec,
    ) -> Result<Vec<RawDocument>, RemoteStoreError> {
        let mut docs = self.fetch_all(collection).await?;
        apply_spec(&mut docs, spec);
        Ok(docs)
    }
}
