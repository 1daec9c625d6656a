//! Remote store adapters.

pub mod http;
pub mod memory;

pub use http::HttpRemoteStore;
pub use memory::InMemoryRemoteStore;
