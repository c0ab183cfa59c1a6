use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fanout_core::FanoutConfig;
use tracing_subscriber::EnvFilter;

use commands::apply::{ApplyArgs, OutputFormat};

mod commands;

const DEFAULT_TEMPLATE: &str = "./tron-template.yaml";

#[derive(Parser)]
#[command(
    name = "fanout",
    about = "fanout — expand a replicated Deployment into individually addressable instances",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to a fanout.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug-level logs (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a template and print the instances as YAML. Nothing is applied.
    Expand {
        /// Template manifest holding one apps/v1 Deployment
        #[arg(default_value = DEFAULT_TEMPLATE)]
        template: PathBuf,
    },
    /// Expand a template and create-or-update every instance.
    ///
    /// Instances are applied in order. An instance that already exists is
    /// replaced; any other failure stops the run and leaves earlier
    /// instances in place.
    Apply {
        /// Template manifest holding one apps/v1 Deployment
        #[arg(default_value = DEFAULT_TEMPLATE)]
        template: PathBuf,
        /// Target namespace (default: [apply].namespace, then "default")
        #[arg(short, long)]
        namespace: Option<String>,
        /// Kubeconfig file (default: $KUBECONFIG, then $HOME/.kube/config)
        #[arg(long)]
        kubeconfig: Option<PathBuf>,
        /// Apply into an embedded database at this path instead of a cluster
        #[arg(long, conflicts_with = "kubeconfig")]
        local_store: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `fanout expand` stdout stays a clean YAML stream.
    let default_filter = if cli.verbose {
        "info,fanout=debug"
    } else {
        "warn,fanout=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?,
        )
        .init();

    let config = FanoutConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Expand { template } => commands::expand::run(&config, &template),
        Commands::Apply {
            template,
            namespace,
            kubeconfig,
            local_store,
            format,
        } => {
            let args = ApplyArgs {
                template,
                namespace,
                kubeconfig,
                local_store,
                format,
            };
            commands::apply::run(&config, args).await
        }
    }
}
