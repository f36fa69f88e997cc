//! Registered clusters
//!
//! Agent connectivity comes from the agent service and is optional: when
//! it cannot be reached the status shows as unknown.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use super::AppContext;
use crate::domain::{ClusterInfo, Operation, OperationSummary};
use crate::error::ReconcileError;
use crate::services::ConfirmDestructive;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Connected,
    Disconnected,
    Unknown,
}

impl AgentStatus {
    /// Agents register under the cluster's name
    fn of(cluster: &ClusterInfo, connected: Option<&[String]>) -> Self {
        match connected {
            Some(agents) if agents.iter().any(|a| a == &cluster.name) => Self::Connected,
            Some(_) => Self::Disconnected,
            None => Self::Unknown,
        }
    }

    fn label(&self) -> colored::ColoredString {
        match self {
            Self::Connected => "yes".green(),
            Self::Disconnected => "no".red(),
            Self::Unknown => "unknown".dimmed(),
        }
    }
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let clusters = ctx
        .cluster()?
        .list_clusters()
        .await
        .context("Failed to list clusters")?;
    let connected = ctx.agent()?.connected_agents().await;

    ui::print_header("Clusters");
    if clusters.is_empty() {
        ui::print_info("No clusters registered");
        return Ok(());
    }
    if connected.is_none() {
        ui::print_warning("Agent service unavailable, connectivity unknown");
    }

    println!("{:<38} {:<24} {}", "UUID".bold(), "NAME".bold(), "CONNECTED".bold());
    for cluster in &clusters {
        let status = AgentStatus::of(cluster, connected.as_deref());
        println!("{:<38} {:<24} {}", cluster.uuid, cluster.name, status.label());
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, uuid: String) -> Result<()> {
    let detail = ctx
        .cluster()?
        .cluster_details(&uuid)
        .await
        .with_context(|| format!("Failed to fetch details of cluster {}", uuid))?
        .with_context(|| format!("Cluster {} is not registered", uuid))?;

    ui::print_header(&format!("Cluster {}", detail.name));
    println!("{:<16} {}", "UUID:".bold(), detail.uuid);
    println!("{:<16} {}", "Name:".bold(), detail.name);
    println!("{:<16} {}", "Prometheus:".bold(), detail.prometheus_url);
    println!(
        "{:<16} {}",
        "Token:".bold(),
        if detail.token.is_empty() { "(none)" } else { "(set)" }
    );
    Ok(())
}

/// Remove a cluster registration. Refused while its agent is connected.
pub async fn delete(ctx: &AppContext, uuid: String) -> Result<OperationSummary> {
    let target = format!("cluster {}", uuid);
    Ok(match delete_cluster(ctx, &uuid).await? {
        Ok(name) => OperationSummary::succeeded(
            Operation::DeleteCluster,
            target,
            format!("{} unregistered", name),
        ),
        Err(e) => OperationSummary::failed(Operation::DeleteCluster, target, &e),
    })
}

async fn delete_cluster(ctx: &AppContext, uuid: &str) -> Result<Result<String, ReconcileError>> {
    let clusters = ctx.cluster()?;
    let agents = ctx.agent()?;

    let registered = match clusters.list_clusters().await {
        Ok(list) => list,
        Err(e) => return Ok(Err(e.into())),
    };
    let Some(cluster) = registered.into_iter().find(|c| c.uuid == uuid) else {
        return Ok(Err(ReconcileError::Precondition(format!(
            "cluster {} is not registered",
            uuid
        ))));
    };

    let connected = agents.connected_agents().await;
    if AgentStatus::of(&cluster, connected.as_deref()) == AgentStatus::Connected {
        return Ok(Err(ReconcileError::Precondition(format!(
            "an agent is still connected to '{}'; remove the agent first",
            cluster.name
        ))));
    }

    let summary = format!("Delete cluster '{}' ({})?", cluster.name, cluster.uuid);
    if !ctx.confirm.confirm(&summary).await {
        return Ok(Err(ReconcileError::ConflictDeletionDeclined(summary)));
    }

    if let Err(e) = clusters.delete_cluster(uuid).await {
        return Ok(Err(e.into()));
    }
    info!(cluster = %uuid, name = %cluster.name, "Deleted cluster");
    Ok(Ok(cluster.name))
}
