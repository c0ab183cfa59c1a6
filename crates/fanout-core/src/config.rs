//! fanout.toml configuration parser and kubeconfig discovery.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Environment variable naming an explicit kubeconfig file.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Namespace used when neither the CLI nor the config names one.
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutConfig {
    pub expand: Option<ExpandConfig>,
    pub apply: Option<ApplyConfig>,
    pub cluster: Option<ClusterConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpandConfig {
    pub placeholder: Option<String>,
    pub replica_label: Option<String>,
    pub separator: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyConfig {
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub kubeconfig: Option<PathBuf>,
}

impl FanoutConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the config at `path`, or an empty config when no path is given.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Namespace to apply into: `flag`, then `[apply].namespace`, then `default`.
    pub fn namespace(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.apply.as_ref().and_then(|a| a.namespace.clone()))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }

    /// Kubeconfig path: `flag`, then `[cluster].kubeconfig`, then the environment.
    pub fn kubeconfig(&self, flag: Option<&Path>) -> ConfigResult<PathBuf> {
        let explicit = flag.or_else(|| {
            self.cluster
                .as_ref()
                .and_then(|c| c.kubeconfig.as_deref())
        });
        resolve_kubeconfig(explicit, |key| std::env::var_os(key))
    }
}

/// Resolve the kubeconfig location.
///
/// An explicit path wins; otherwise `$KUBECONFIG`, then
/// `$HOME/.kube/config`. Empty variables count as unset.
pub fn resolve_kubeconfig<F>(explicit: Option<&Path>, lookup: F) -> ConfigResult<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let present = |key: &str| lookup(key).filter(|value| !value.is_empty());
    if let Some(path) = present(KUBECONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    if let Some(home) = present("HOME") {
        return Ok(PathBuf::from(home).join(".kube").join("config"));
    }
    Err(ConfigError::KubeconfigNotFound)
}
