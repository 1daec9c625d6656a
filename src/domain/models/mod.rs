//! Domain models: documents, queries, schemas and configuration.

pub mod config;
pub mod document;
pub mod query;
pub mod schema;

pub use config::{CacheConfig, Config, LoggingConfig, RetryConfig};
pub use document::{RawDocument, Record};
pub use query::{FieldFilter, FilterOp, QuerySpec, SortDirection};
pub use schema::{FieldRule, FieldType, Schema, ValidationOutcome};
