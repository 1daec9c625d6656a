//! docvault: a cached, retrying, validating data access layer for remote
//! document stores.
//!
//! The crate is organized in layers:
//!
//! - [`domain`]: entity-agnostic models ([`RawDocument`], [`Record`],
//!   [`QuerySpec`], [`Schema`]), the [`RemoteStore`] and [`AccessPolicy`]
//!   ports, and the error taxonomy.
//! - [`infrastructure`]: the TTL cache, the retry executor, the process-wide
//!   invalidation registry, configuration loading and logging setup.
//! - [`adapters`]: [`RemoteStore`] implementations (HTTP JSON REST and an
//!   in-memory store).
//! - [`services`]: the [`Repository`] facade that composes all of the above.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use docvault::{FieldRule, FieldType, InMemoryRemoteStore, Repository, Schema};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     email: String,
//! }
//!
//! # async fn run() -> Result<(), docvault::DataAccessError> {
//! let store = Arc::new(InMemoryRemoteStore::new());
//! let schema = Schema::new()
//!     .field(FieldRule::new("name", FieldType::String).required().non_empty())
//!     .field(FieldRule::new("email", FieldType::String).required());
//!
//! let users: Repository<User> = Repository::new("users", store).with_schema(schema);
//!
//! let id = users
//!     .create(&User {
//!         name: "Ada".to_string(),
//!         email: "ada@example.com".to_string(),
//!     })
//!     .await?;
//!
//! let user = users.get_by_id(&id, true).await?;
//! assert!(user.is_some());
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use adapters::{HttpRemoteStore, InMemoryRemoteStore};
pub use domain::errors::{
    DataAccessError, DataResult, ErrorCause, Operation, RemoteStoreError,
};
pub use domain::models::{
    CacheConfig, Config, FieldFilter, FieldRule, FieldType, FilterOp, LoggingConfig, QuerySpec,
    RawDocument, Record, RetryConfig, Schema, SortDirection, ValidationOutcome,
};
pub use domain::ports::{AccessPolicy, AllowAll, RemoteStore};
pub use infrastructure::cache::{TtlCache, DEFAULT_TTL};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::{init as init_logging, LogGuard};
pub use infrastructure::registry::{invalidate_all, invalidate_collection};
pub use infrastructure::retry::{RetryExecutor, RetryPolicy};
pub use services::Repository;
