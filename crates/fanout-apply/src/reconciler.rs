//! Reconciler — sequential create-or-update of expanded instances.
//!
//! Each instance is created; an "already exists" answer turns into a full
//! replace via update. Any other failure aborts the run. There is no retry
//! and no rollback: what was applied before the failure stays applied.

use std::sync::Arc;

use fanout_store::{DeploymentStore, StoreError};
use k8s_openapi::api::apps::v1::Deployment;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{ApplyError, ApplyResult, Operation};
use crate::phase::InstancePhase;

/// Final phase of one applied instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceOutcome {
    pub name: String,
    pub phase: InstancePhase,
}

/// Summary of a successful apply run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub namespace: String,
    pub outcomes: Vec<InstanceOutcome>,
}

impl ApplyReport {
    fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            outcomes: Vec::new(),
        }
    }

    /// Number of instances that were newly created.
    pub fn created(&self) -> usize {
        self.count(InstancePhase::Created)
    }

    /// Number of instances that already existed and were replaced.
    pub fn updated(&self) -> usize {
        self.count(InstancePhase::Updated)
    }

    fn count(&self, phase: InstancePhase) -> usize {
        self.outcomes.iter().filter(|o| o.phase == phase).count()
    }
}

/// Applies instance sequences to an injected store.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn DeploymentStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DeploymentStore>) -> Self {
        Self { store }
    }

    /// Apply `instances` in order, stopping at the first fatal error.
    pub async fn apply(&self, instances: &[Deployment]) -> ApplyResult<ApplyReport> {
        let namespace = self.store.namespace();
        let mut report = ApplyReport::new(namespace);
        info!(%namespace, count = instances.len(), "applying deployments");

        for (offset, instance) in instances.iter().enumerate() {
            let position = offset + 1;
            let name = instance
                .metadata
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .ok_or(ApplyError::UnnamedInstance { position })?;

            let phase = self
                .apply_one(instance, &name, position, report.outcomes.len())
                .await?;
            report.outcomes.push(InstanceOutcome { name, phase });
        }

        info!(
            %namespace,
            created = report.created(),
            updated = report.updated(),
            "apply finished"
        );
        Ok(report)
    }

    async fn apply_one(
        &self,
        instance: &Deployment,
        name: &str,
        position: usize,
        applied: usize,
    ) -> ApplyResult<InstancePhase> {
        let mut phase = InstancePhase::Pending;
        debug!(%name, position, "creating deployment");

        match self.store.create(instance).await {
            Ok(_) => {
                phase.transition(InstancePhase::Created)?;
                info!(%name, "deployment created");
            }
            Err(err) if err.is_already_exists() => {
                phase.transition(InstancePhase::Conflict)?;
                info!(%name, "deployment already exists; updating instead");

                if let Err(source) = self.store.update(instance).await {
                    phase.transition(InstancePhase::Failed)?;
                    return Err(failure(name, position, Operation::Update, applied, source));
                }
                phase.transition(InstancePhase::Updated)?;
                info!(%name, "deployment updated");
            }
            Err(source) => {
                phase.transition(InstancePhase::Failed)?;
                return Err(failure(name, position, Operation::Create, applied, source));
            }
        }
        Ok(phase)
    }
}

fn failure(
    name: &str,
    position: usize,
    operation: Operation,
    applied: usize,
    source: StoreError,
) -> ApplyError {
    error!(%name, position, %operation, applied, error = %source, "apply aborted");
    ApplyError::Instance {
        name: name.to_string(),
        position,
        operation,
        applied,
        source,
    }
}
