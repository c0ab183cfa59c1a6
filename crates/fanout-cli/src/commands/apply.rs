use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use fanout_apply::{ApplyReport, Reconciler};
use fanout_core::FanoutConfig;
use fanout_store::{DeploymentStore, KubeStore, LocalStore};
use tracing::info;

use super::expand::load_instances;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ApplyArgs {
    pub template: PathBuf,
    pub namespace: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub local_store: Option<PathBuf>,
    pub format: OutputFormat,
}

pub async fn run(config: &FanoutConfig, args: ApplyArgs) -> anyhow::Result<()> {
    // Template problems surface before any store is opened.
    let instances = load_instances(config, &args.template)?;
    let namespace = config.namespace(args.namespace.as_deref());

    let store: Arc<dyn DeploymentStore> = match &args.local_store {
        Some(path) => {
            info!(?path, "using local store");
            Arc::new(LocalStore::open(path, &namespace)?)
        }
        None => {
            let kubeconfig = config.kubeconfig(args.kubeconfig.as_deref())?;
            Arc::new(KubeStore::connect(&kubeconfig, &namespace).await?)
        }
    };

    let report = Reconciler::new(store).apply(&instances).await?;
    println!("{}", render(&report, args.format)?);
    Ok(())
}

fn render(report: &ApplyReport, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(report)?);
    }
    let mut out = String::new();
    for outcome in &report.outcomes {
        out.push_str(&format!(
            "deployment.apps/{} {}\n",
            outcome.name, outcome.phase
        ));
    }
    out.push_str(&format!(
        "{} created, {} updated in namespace {}",
        report.created(),
        report.updated(),
        report.namespace
    ));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanout_apply::{InstanceOutcome, InstancePhase};

    fn fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/tron-template.yaml")
    }

    fn args(store: PathBuf) -> ApplyArgs {
        ApplyArgs {
            template: fixture(),
            namespace: Some("games".to_string()),
            kubeconfig: None,
            local_store: Some(store),
            format: OutputFormat::Text,
        }
    }

    #[tokio::test]
    async fn apply_into_local_store_twice() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("fanout.redb");
        let config = FanoutConfig::default();

        run(&config, args(db.clone())).await.unwrap();
        run(&config, args(db.clone())).await.unwrap();

        let store = LocalStore::open(&db, "games").unwrap();
        let stored = store.list().unwrap();
        assert_eq!(stored.len(), 3);
        assert!(
            stored
                .iter()
                .all(|d| d.metadata.resource_version.as_deref() == Some("2"))
        );
    }

    #[tokio::test]
    async fn bad_template_never_touches_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("fanout.redb");
        let mut bad = args(db.clone());
        bad.template = dir.path().join("missing.yaml");

        let err = run(&FanoutConfig::default(), bad).await.unwrap_err();
        assert!(err.to_string().contains("failed to load template"));
        assert!(!db.exists());
    }

    #[test]
    fn text_report_lists_each_instance() {
        let report = ApplyReport {
            namespace: "games".to_string(),
            outcomes: vec![
                InstanceOutcome {
                    name: "tron-1".to_string(),
                    phase: InstancePhase::Created,
                },
                InstanceOutcome {
                    name: "tron-2".to_string(),
                    phase: InstancePhase::Updated,
                },
            ],
        };
        let text = render(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("deployment.apps/tron-1 created"));
        assert!(text.contains("deployment.apps/tron-2 updated"));
        assert!(text.ends_with("1 created, 1 updated in namespace games"));

        let json = render(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["outcomes"][1]["phase"], "updated");
    }
}
