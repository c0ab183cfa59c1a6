//! fanout-core — the collaborators around the expansion engine.
//!
//! - **`manifest`** — decodes a YAML/JSON template into exactly one
//!   `apps/v1` `Deployment`, and renders expanded instances back to YAML.
//! - **`config`** — optional `fanout.toml` and kubeconfig discovery.

pub mod config;
pub mod error;
pub mod manifest;

pub use config::FanoutConfig;
pub use error::{ConfigError, ConfigResult, ManifestError, ManifestResult};
pub use manifest::{decode_deployment, encode_instances, read_deployment};
