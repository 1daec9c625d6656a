//! Permission-check hook consulted before every repository operation.

use async_trait::async_trait;

use crate::domain::errors::{Operation, RemoteStoreError};

/// External authorization hook.
///
/// Authorization decisions live outside this layer; the repository only
/// consults the hook and surfaces denials. Denials are never retried.
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Return [`RemoteStoreError::PermissionDenied`] to block the operation.
    async fn check(&self, collection: &str, operation: Operation) -> Result<(), RemoteStoreError>;
}

/// Policy that allows every operation. Used when no hook is registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AccessPolicy for AllowAll {
    async fn check(
        &self,
        _collection: &str,
        _operation: Operation,
    ) -> Result<(), RemoteStoreError> {
        Ok(())
    }
}
