//! The store seam between the reconciler and a declarative object store.

use std::future::Future;
use std::pin::Pin;

use k8s_openapi::api::apps::v1::Deployment;

use crate::error::{StoreError, StoreResult};

/// Boxed future alias for store calls.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Create/update access to deployments in a single namespace.
///
/// `create` must fail with [`StoreError::AlreadyExists`] when an object
/// with the same name is present; `update` replaces the whole object.
pub trait DeploymentStore: Send + Sync {
    /// Namespace every call is scoped to.
    fn namespace(&self) -> &str;

    /// Create `deployment`; returns the object as stored.
    fn create<'a>(&'a self, deployment: &'a Deployment) -> StoreFuture<'a, Deployment>;

    /// Replace the stored object of the same name with `deployment`.
    fn update<'a>(&'a self, deployment: &'a Deployment) -> StoreFuture<'a, Deployment>;
}

/// The object name a store call addresses.
pub(crate) fn object_name(deployment: &Deployment) -> StoreResult<&str> {
    deployment
        .metadata
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| StoreError::Invalid("metadata.name is required".to_string()))
}
