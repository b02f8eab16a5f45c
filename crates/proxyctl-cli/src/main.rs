//! proxyctl - API proxy and shared-flow bundle manager
//!
//! Usage:
//!   proxyctl import ./my-proxy            # package and import a bundle directory
//!   proxyctl deploy hello -e test         # deploy the latest revision
//!   proxyctl undeploy hello -e test       # undeploy every live revision
//!   proxyctl export hello --rev 3         # download a revision as a zip

mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proxyctl_core::config::{ConfigStore, Settings};
use proxyctl_core::context::AppContext;
use proxyctl_core::http::StaticToken;
use proxyctl_core::orchestrator::{DeployOptions, UndeployReport};
use proxyctl_core::types::{AssetType, Revision, RevisionRef};

#[derive(Parser)]
#[command(name = "proxyctl")]
#[command(about = "Package, import, export and deploy API proxies and shared flows", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to config.toml (default: the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Organization name
    #[arg(long, global = true)]
    org: Option<String>,

    /// Full organization base URL, e.g. https://apigee.googleapis.com/v1/organizations/acme
    #[arg(long, global = true)]
    url: Option<String>,

    /// Bearer token for the management API
    #[arg(long, global = true, env = "PROXYCTL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log every request
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Asset type (proxy or sharedflow)
    #[arg(long = "type", global = true, default_value = "proxy")]
    asset_type: AssetType,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a bundle directory or zip archive as a new revision
    Import {
        /// Directory containing the bundle root folder, or a .zip archive
        source: PathBuf,
        /// Asset name (default: read from the bundle descriptor)
        #[arg(long)]
        name: Option<String>,
    },

    /// Download a revision as a zip bundle
    Export {
        name: String,
        /// Revision (default: latest)
        #[arg(long)]
        rev: Option<Revision>,
        /// Directory to write the bundle into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Deploy a revision to an environment
    Deploy {
        name: String,
        #[arg(short, long)]
        env: String,
        /// Revision (default: latest)
        #[arg(long)]
        rev: Option<Revision>,
        /// Do not supersede revisions already deployed
        #[arg(long)]
        no_override: bool,
        /// Drain seconds before swapping (classic API only)
        #[arg(long)]
        delay: Option<u32>,
        /// Service account the deployed asset runs as
        #[arg(long)]
        service_account: Option<String>,
        /// Base path override (proxies only)
        #[arg(long)]
        basepath: Option<String>,
    },

    /// Undeploy one revision, or every live revision when --rev is omitted
    Undeploy {
        name: String,
        #[arg(short, long)]
        env: String,
        #[arg(long)]
        rev: Option<Revision>,
    },

    /// List revisions of an asset
    Revisions { name: String },

    /// List deployments, optionally filtered by asset and environment
    Deployments {
        name: Option<String>,
        #[arg(short, long)]
        env: Option<String>,
    },

    /// List assets of the selected type
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.global.verbose > 0 {
        "proxyctl=debug"
    } else {
        "proxyctl=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    let ctx = build_context(&cli.global)?;
    run(&ctx, cli.global.asset_type, cli.command, &cancel).await
}

fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    let store = match &global.config {
        Some(path) => ConfigStore::from_path(path.clone()),
        None => ConfigStore::from_default_dir().context("Failed to locate config directory")?,
    };
    let mut settings = store
        .load()
        .with_context(|| format!("Failed to load {}", store.config_path().display()))?;
    if let Some(org) = &global.org {
        settings.connection.organization = Some(org.clone());
    }
    if let Some(url) = &global.url {
        settings.connection.base_url = Some(url.clone());
    }
    settings.connection.verbosity = settings.connection.verbosity.max(global.verbose);
    Ok(settings)
}

fn build_context(global: &GlobalArgs) -> Result<AppContext> {
    let settings = load_settings(global)?;
    let Some(token) = global.token.as_deref().filter(|t| !t.is_empty()) else {
        bail!("No token given; pass --token or set PROXYCTL_TOKEN");
    };
    AppContext::new(settings, Arc::new(StaticToken::new(token)))
        .context("Failed to set up the management connection")
}

async fn run(
    ctx: &AppContext,
    asset_type: AssetType,
    command: Commands,
    cancel: &CancellationToken,
) -> Result<()> {
    match command {
        Commands::Import { source, name } => {
            let imported = ctx
                .pipeline()
                .import(asset_type, &source, name.as_deref(), cancel)
                .await
                .with_context(|| format!("Failed to import {}", source.display()))?;
            output::print_json(&imported)?;
        }
        Commands::Export { name, rev, out_dir } => {
            let bundle = ctx
                .pipeline()
                .export(asset_type, &name, rev.map(RevisionRef::from), cancel)
                .await
                .with_context(|| format!("Failed to export {}", name))?;
            let path = bundle
                .write_to(&out_dir)
                .await
                .with_context(|| format!("Failed to write bundle into {}", out_dir.display()))?;
            output::print_json(&output::ExportSummary::new(&bundle, &path))?;
        }
        Commands::Deploy {
            name,
            env,
            rev,
            no_override,
            delay,
            service_account,
            basepath,
        } => {
            let options = DeployOptions {
                override_existing: !no_override && ctx.settings().deploy.override_existing,
                delay,
                service_account,
                basepath,
            };
            let ack = ctx
                .orchestrator()
                .deploy(
                    asset_type,
                    &name,
                    &env,
                    rev.map(RevisionRef::from),
                    &options,
                    cancel,
                )
                .await
                .with_context(|| format!("Failed to deploy {} to {}", name, env))?;
            output::print_json(&ack)?;
        }
        Commands::Undeploy { name, env, rev } => {
            let report = ctx
                .orchestrator()
                .undeploy(asset_type, &name, &env, rev.map(RevisionRef::from), cancel)
                .await
                .with_context(|| format!("Failed to undeploy {} from {}", name, env))?;
            let failed = match &report {
                UndeployReport::All(outcomes) => outcomes.iter().filter(|o| !o.succeeded()).count(),
                UndeployReport::Revision { .. } => 0,
            };
            output::print_json(&output::undeploy_json(&report))?;
            if failed > 0 {
                bail!("{} revision(s) of {} could not be undeployed", failed, name);
            }
        }
        Commands::Revisions { name } => {
            let revisions = ctx
                .revisions()
                .list_revisions(asset_type, &name, cancel)
                .await
                .with_context(|| format!("Failed to list revisions of {}", name))?;
            output::print_json(&revisions)?;
        }
        Commands::Deployments { name, env } => {
            let deployments = ctx
                .deployments()
                .list_deployments(asset_type, name.as_deref(), env.as_deref(), cancel)
                .await
                .context("Failed to list deployments")?;
            output::print_json(&deployments)?;
        }
        Commands::List => {
            let names = ctx
                .catalog(asset_type)
                .list(cancel)
                .await
                .with_context(|| format!("Failed to list {}", asset_type.collection()))?;
            output::print_json(&names)?;
        }
    }
    Ok(())
}
