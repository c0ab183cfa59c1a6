//! redb table definitions for the local store.
//!
//! Keys are `{namespace}/{name}`; values are JSON-serialized `Deployment`s.

use redb::TableDefinition;

/// Deployments keyed by `{namespace}/{name}`.
pub const DEPLOYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("deployments");
