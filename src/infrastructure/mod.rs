//! Infrastructure: caching, retry, configuration, logging and the
//! process-wide invalidation registry.

pub mod cache;
pub mod config;
pub mod logging;
pub mod registry;
pub mod retry;
