//! fanout-expand — turns one replicated `Deployment` into N instances.
//!
//! Given a template with `spec.replicas = N`, [`Expander::expand`] returns
//! N single-replica deployments named `<name>-1 ..= <name>-N`. Each one
//! carries a `replica=<i>` label on its own metadata, its selector and its
//! pod template, and has the placeholder token in container environment
//! values replaced by `i`.
//!
//! Every instance is a full `Clone` of the template, so no label map, env
//! list or other nested value is shared between instances or with the
//! template.
//!
//! Expansion is pure: no I/O, deterministic, output in ascending index order.

pub mod error;
pub mod expander;
pub mod placeholder;

pub use error::{ExpandError, ExpandResult};
pub use expander::{ExpandOptions, Expander, expand};
