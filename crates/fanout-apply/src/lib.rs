//! fanout-apply — reconciles expanded instances against a store.
//!
//! For each instance, in order: create it; if the store says it already
//! exists, replace it with an update; on any other failure stop and report
//! which instance failed. Instances applied before the failure stay applied.
//!
//! # Components
//!
//! - **`phase`** — per-instance state machine (Pending → Created | Conflict → Updated | Failed)
//! - **`reconciler`** — the sequential create-or-update loop and its report

pub mod error;
pub mod phase;
pub mod reconciler;

pub use error::{ApplyError, ApplyResult, Operation};
pub use phase::InstancePhase;
pub use reconciler::{ApplyReport, InstanceOutcome, Reconciler};
