use std::path::Path;

use anyhow::Context;
use fanout_core::{FanoutConfig, encode_instances, read_deployment};
use fanout_expand::{ExpandOptions, Expander};
use k8s_openapi::api::apps::v1::Deployment;

/// Print the expanded instances as a YAML stream; nothing is applied.
pub fn run(config: &FanoutConfig, template: &Path) -> anyhow::Result<()> {
    let instances = load_instances(config, template)?;
    print!("{}", encode_instances(&instances)?);
    Ok(())
}

/// Decode and expand a template file.
pub fn load_instances(config: &FanoutConfig, template: &Path) -> anyhow::Result<Vec<Deployment>> {
    let deployment = read_deployment(template)
        .with_context(|| format!("failed to load template {}", template.display()))?;
    let expander = Expander::new(ExpandOptions::from_config(config));
    let instances = expander
        .expand(&deployment)
        .with_context(|| format!("failed to expand template {}", template.display()))?;
    Ok(instances)
}
