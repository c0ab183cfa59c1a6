//! Reconciliation error types.

use std::fmt;

use fanout_store::StoreError;
use serde::Serialize;
use thiserror::Error;

use crate::phase::InstancePhase;

/// Store call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => f.write_str("create"),
            Operation::Update => f.write_str("update"),
        }
    }
}

/// Errors that abort an apply run.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("instance {position} has no metadata.name")]
    UnnamedInstance { position: usize },

    #[error(
        "failed to {operation} deployment {name} (instance {position}, {applied} applied before it): {source}"
    )]
    Instance {
        name: String,
        /// 1-based position in the instance sequence.
        position: usize,
        operation: Operation,
        /// Instances that were created or updated before this one.
        applied: usize,
        #[source]
        source: StoreError,
    },

    #[error("illegal phase transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: InstancePhase,
        to: InstancePhase,
    },
}

pub type ApplyResult<T> = Result<T, ApplyError>;
