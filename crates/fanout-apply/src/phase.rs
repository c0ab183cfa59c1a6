//! Per-instance apply phases.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ApplyError, ApplyResult};

/// Where one instance is in the create-or-update protocol.
///
/// ```text
/// Pending ──► Created
///    │
///    ├──► Conflict ──► Updated
///    │        │
///    └────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePhase {
    /// Not sent to the store yet.
    Pending,
    /// Create succeeded.
    Created,
    /// Create reported that the object already exists.
    Conflict,
    /// Update after a conflict succeeded.
    Updated,
    /// A store call failed; the batch stops here.
    Failed,
}

impl InstancePhase {
    pub fn can_transition(self, next: InstancePhase) -> bool {
        use InstancePhase::*;
        matches!(
            (self, next),
            (Pending, Created)
                | (Pending, Conflict)
                | (Pending, Failed)
                | (Conflict, Updated)
                | (Conflict, Failed)
        )
    }

    /// Move to `next`, rejecting transitions outside the protocol.
    pub fn transition(&mut self, next: InstancePhase) -> ApplyResult<()> {
        if !self.can_transition(next) {
            return Err(ApplyError::IllegalTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for InstancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstancePhase::Pending => "pending",
            InstancePhase::Created => "created",
            InstancePhase::Conflict => "conflict",
            InstancePhase::Updated => "updated",
            InstancePhase::Failed => "failed",
        };
        f.write_str(s)
    }
}
