use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod infrastructure;
mod services;
mod ui;

#[cfg(test)]
mod test_support;

use cli::{Cli, ClusterCommands, Commands, TargetArgs};
use commands::{clusters, dark_release, delete, deploy, entities, workloads, AppContext};
use config::{MeshConfig, Overrides};
use domain::{OperationSummary, ServiceKey};
use infrastructure::SessionContext;
use services::ConfirmPolicy;

impl From<TargetArgs> for ServiceKey {
    fn from(target: TargetArgs) -> Self {
        ServiceKey::new(target.cluster, target.namespace, target.service)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false) // Disable ANSI escape codes for cleaner output
        .init();

    let config = MeshConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(Overrides {
            cluster_api: cli.cluster_api,
            agent_api: cli.agent_api,
            crd_api: cli.crd_api,
            settle_delay: cli.settle_delay,
        })
        .context("Invalid configuration")?;

    let ctx = AppContext {
        config,
        session: SessionContext::new(cli.token),
        confirm: ConfirmPolicy::from_flags(cli.yes, cli.non_interactive),
    };

    debug!(
        cluster_api = %ctx.config.endpoints.cluster_api,
        crd_api = %ctx.config.endpoints.crd_api,
        authenticated = ctx.session.is_authenticated(),
        "Configuration loaded"
    );

    // Execute command; mutating commands yield a summary
    let summary: Option<OperationSummary> = match cli.command {
        Commands::Clusters => {
            clusters::list(&ctx).await?;
            None
        }
        Commands::Cluster { command } => match command {
            ClusterCommands::Show { uuid } => {
                clusters::show(&ctx, uuid).await?;
                None
            }
            ClusterCommands::Delete { uuid } => Some(clusters::delete(&ctx, uuid).await?),
        },
        Commands::Namespaces { cluster } => {
            workloads::namespaces(&ctx, cluster).await?;
            None
        }
        Commands::Services { cluster, namespace } => {
            workloads::services(&ctx, cluster, namespace).await?;
            None
        }
        Commands::Versions { target } => {
            workloads::versions(&ctx, target.cluster, target.namespace, target.service).await?;
            None
        }
        Commands::Entities {
            cluster,
            namespace,
            service,
            watch,
            interval,
        } => {
            let selection = match (namespace, service) {
                (Some(namespace), Some(service)) => entities::Selection::Service { namespace, service },
                _ => entities::Selection::Cluster,
            };
            entities::execute(&ctx, cluster, selection, watch.then_some(interval)).await?;
            None
        }
        Commands::Deploy { target, version } => {
            Some(deploy::execute_standard(&ctx, target.into(), version).await?)
        }
        Commands::Canary {
            target,
            original,
            canary,
            ratio,
            sticky,
            pod_scale,
            schedules,
        } => {
            let args = deploy::CanaryArgs {
                original,
                canary,
                ratio,
                sticky,
                pod_scale,
                schedules,
            };
            Some(deploy::execute_canary(&ctx, target.into(), args).await?)
        }
        Commands::DarkRelease { target, version, ip } => {
            Some(dark_release::execute(&ctx, target.into(), version, ip).await?)
        }
        Commands::DeleteEntity { id } => Some(delete::execute_entity(&ctx, id).await?),
        Commands::DeleteDarkRelease { id } => Some(delete::execute_dark_release(&ctx, id).await?),
    };

    if let Some(summary) = summary {
        ui::print_summary(&summary);
        if !summary.is_success() {
            std::process::exit(1);
        }
    }

    Ok(())
}
