//! Expansion error types.

use thiserror::Error;

/// Reasons a template cannot be expanded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpandError {
    #[error("template has no metadata.name")]
    MissingName,

    #[error("template has no spec")]
    MissingSpec,

    #[error("template has no spec.replicas")]
    MissingReplicas,

    #[error("spec.replicas must be at least 1, got {0}")]
    InvalidReplicas(i32),

    #[error("placeholder token must not be empty")]
    EmptyPlaceholder,

    #[error("replica label key must not be empty")]
    EmptyLabelKey,
}

pub type ExpandResult<T> = Result<T, ExpandError>;
