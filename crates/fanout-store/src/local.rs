//! LocalStore — redb-backed deployment store.
//!
//! Mirrors the API server's create/update contract closely enough to stand
//! in for a cluster: `create` refuses an existing name, `update` refuses a
//! missing one, and every write bumps `metadata.resourceVersion`. Values are
//! JSON-serialized `Deployment`s; the in-memory backend is used in tests.

use std::path::Path;
use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{DeploymentStore, StoreFuture, object_name};
use crate::tables::DEPLOYMENTS;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Create,
    Update,
}

/// Thread-safe, namespace-scoped deployment store backed by redb.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Database>,
    namespace: String,
}

impl LocalStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path, namespace: &str) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            namespace: namespace.to_string(),
        };
        store.ensure_tables()?;
        debug!(?path, %namespace, "local store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory(namespace: &str) -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(db),
            namespace: namespace.to_string(),
        };
        store.ensure_tables()?;
        debug!(%namespace, "in-memory local store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Same store, scoped to another namespace.
    pub fn in_namespace(&self, namespace: &str) -> Self {
        Self {
            db: self.db.clone(),
            namespace: namespace.to_string(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}/{}", self.namespace, name)
    }

    /// Get a deployment by name.
    pub fn get(&self, name: &str) -> StoreResult<Option<Deployment>> {
        let key = self.key(name);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let deployment: Deployment =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(deployment))
            }
            None => Ok(None),
        }
    }

    /// List all deployments in this store's namespace, ordered by name.
    pub fn list(&self) -> StoreResult<Vec<Deployment>> {
        let prefix = format!("{}/", self.namespace);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let deployment: Deployment =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(deployment);
            }
        }
        Ok(results)
    }

    fn write(&self, deployment: &Deployment, mode: WriteMode) -> StoreResult<Deployment> {
        let name = object_name(deployment)?;
        if let Some(ns) = deployment.metadata.namespace.as_deref() {
            if ns != self.namespace {
                return Err(StoreError::Invalid(format!(
                    "namespace {ns} does not match store namespace {}",
                    self.namespace
                )));
            }
        }

        let key = self.key(name);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let stored = {
            let mut table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            let existing: Option<Deployment> =
                match table.get(key.as_str()).map_err(map_err!(Read))? {
                    Some(guard) => {
                        Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
                    }
                    None => None,
                };

            match (mode, &existing) {
                (WriteMode::Create, Some(_)) => {
                    return Err(StoreError::AlreadyExists(name.to_string()));
                }
                (WriteMode::Update, None) => return Err(StoreError::NotFound(name.to_string())),
                _ => {}
            }

            let version = existing
                .and_then(|d| d.metadata.resource_version)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
                + 1;

            let mut stored = deployment.clone();
            stored.metadata.namespace = Some(self.namespace.clone());
            stored.metadata.resource_version = Some(version.to_string());

            let value = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            stored
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, ?mode, "deployment stored");
        Ok(stored)
    }
}

impl DeploymentStore for LocalStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn create<'a>(&'a self, deployment: &'a Deployment) -> StoreFuture<'a, Deployment> {
        Box::pin(async move { self.write(deployment, WriteMode::Create) })
    }

    fn update<'a>(&'a self, deployment: &'a Deployment) -> StoreFuture<'a, Deployment> {
        Box::pin(async move { self.write(deployment, WriteMode::Update) })
    }
}
