//! KubeStore — deployments on a Kubernetes API server.

use std::path::Path;

use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{DeploymentStore, StoreFuture, object_name};

/// `DeploymentStore` backed by the `apps/v1` deployments API of one namespace.
#[derive(Clone)]
pub struct KubeStore {
    api: Api<Deployment>,
    namespace: String,
}

impl KubeStore {
    /// Wrap an existing client.
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
        }
    }

    /// Build a client from the kubeconfig at `path` (current context).
    pub async fn connect(path: &Path, namespace: &str) -> StoreResult<Self> {
        let kubeconfig = Kubeconfig::read_from(path)
            .map_err(|e| StoreError::Connect(format!("{}: {e}", path.display())))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        let cluster_url = config.cluster_url.to_string();
        let client = Client::try_from(config).map_err(|e| StoreError::Connect(e.to_string()))?;
        info!(kubeconfig = ?path, %cluster_url, %namespace, "connected to cluster");
        Ok(Self::new(client, namespace))
    }
}

impl DeploymentStore for KubeStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn create<'a>(&'a self, deployment: &'a Deployment) -> StoreFuture<'a, Deployment> {
        Box::pin(async move {
            let name = object_name(deployment)?;
            debug!(%name, namespace = %self.namespace, "POST deployment");
            self.api
                .create(&PostParams::default(), deployment)
                .await
                .map_err(|e| classify(e, name))
        })
    }

    fn update<'a>(&'a self, deployment: &'a Deployment) -> StoreFuture<'a, Deployment> {
        Box::pin(async move {
            let name = object_name(deployment)?;
            debug!(%name, namespace = %self.namespace, "PUT deployment");
            self.api
                .replace(name, &PostParams::default(), deployment)
                .await
                .map_err(|e| classify(e, name))
        })
    }
}

/// Map a client error onto the store taxonomy.
///
/// Only a status whose reason is `AlreadyExists` counts as a name clash; a
/// bare 409 can also be an optimistic-concurrency conflict.
fn classify(err: kube::Error, name: &str) -> StoreError {
    match err {
        kube::Error::Api(status) if status.reason == "AlreadyExists" => {
            StoreError::AlreadyExists(name.to_string())
        }
        kube::Error::Api(status) if status.reason == "NotFound" => {
            StoreError::NotFound(name.to_string())
        }
        kube::Error::Api(status) => StoreError::Api {
            code: status.code,
            reason: status.reason,
            message: status.message,
        },
        other => StoreError::Request(other.to_string()),
    }
}
