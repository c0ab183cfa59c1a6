//! Error types for manifest decoding and configuration.

use std::path::PathBuf;

use thiserror::Error;

pub type ManifestResult<T> = Result<T, ManifestError>;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while turning template bytes into a `Deployment`.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest contains no documents")]
    Empty,

    #[error("manifest contains {0} documents, expected exactly one Deployment")]
    MultipleDocuments(usize),

    #[error("expected apps/v1 Deployment, found {api_version} {kind}")]
    WrongKind { api_version: String, kind: String },

    #[error("invalid manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised while loading `fanout.toml` or locating a kubeconfig.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no kubeconfig found: set $KUBECONFIG or put it in $HOME/.kube/config")]
    KubeconfigNotFound,
}
