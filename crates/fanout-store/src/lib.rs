//! fanout-store — namespace-scoped create/update of deployments.
//!
//! The reconciler talks to a [`DeploymentStore`]; this crate provides two:
//!
//! - **`cluster`** — [`KubeStore`], the Kubernetes API server via `kube`.
//! - **`local`** — [`LocalStore`], an embedded [redb](https://docs.rs/redb)
//!   database with the same create/update contract, for offline runs and tests.
//!
//! Both classify failures into [`StoreError`]; the one the reconciler cares
//! about is [`StoreError::AlreadyExists`].

pub mod cluster;
pub mod error;
pub mod local;
pub mod store;
pub mod tables;

pub use cluster::KubeStore;
pub use error::{StoreError, StoreResult};
pub use local::LocalStore;
pub use store::{DeploymentStore, StoreFuture};
