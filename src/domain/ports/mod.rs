//! Ports: traits the surrounding system implements or consumes.

pub mod access_policy;
pub mod remote_store;

pub use access_policy::{AccessPolicy, AllowAll};
pub use remote_store::RemoteStore;
