//! Template manifest decoding and instance rendering.
//!
//! A template is a YAML (or JSON) stream holding exactly one `apps/v1`
//! `Deployment`. Blank documents (a stray `---`, comment-only blocks) are
//! ignored; anything else that is not a Deployment is rejected before the
//! expansion engine ever sees it.

use std::path::Path;

use k8s_openapi::api::apps::v1::Deployment;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

use crate::error::{ManifestError, ManifestResult};

const API_VERSION: &str = "apps/v1";
const KIND: &str = "Deployment";

/// Read and decode a template file.
pub fn read_deployment(path: &Path) -> ManifestResult<Deployment> {
    let bytes = std::fs::read(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?path, bytes = bytes.len(), "template read");
    decode_deployment(&bytes)
}

/// Decode raw template bytes into a single `Deployment`.
pub fn decode_deployment(bytes: &[u8]) -> ManifestResult<Deployment> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_slice(bytes) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }

    let value = match documents.len() {
        0 => return Err(ManifestError::Empty),
        1 => documents.remove(0),
        n => return Err(ManifestError::MultipleDocuments(n)),
    };

    let api_version = string_field(&value, "apiVersion");
    let kind = string_field(&value, "kind");
    if api_version != API_VERSION || kind != KIND {
        return Err(ManifestError::WrongKind { api_version, kind });
    }

    let deployment: Deployment = serde_yaml::from_value(value)?;
    debug!(name = ?deployment.metadata.name, "deployment decoded");
    Ok(deployment)
}

/// Render instances as a `---`-separated YAML stream.
pub fn encode_instances(instances: &[Deployment]) -> ManifestResult<String> {
    let mut out = String::new();
    for instance in instances {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(instance)?);
    }
    Ok(out)
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
