//! Namespaces, services and versions inside a cluster

use anyhow::{Context, Result};

use super::AppContext;
use crate::ui;

pub async fn namespaces(ctx: &AppContext, cluster: String) -> Result<()> {
    let namespaces = ctx
        .cluster()?
        .namespaces(&cluster)
        .await
        .with_context(|| format!("Failed to list namespaces in cluster {}", cluster))?;
    print_list(&namespaces, &format!("No namespaces in cluster {}", cluster));
    Ok(())
}

pub async fn services(ctx: &AppContext, cluster: String, namespace: String) -> Result<()> {
    let services = ctx
        .cluster()?
        .services(&cluster, &namespace)
        .await
        .with_context(|| format!("Failed to list services in {}", namespace))?;
    print_list(&services, &format!("No services in namespace {}", namespace));
    Ok(())
}

/// Versions currently running, read from the deployments' image tags
pub async fn versions(
    ctx: &AppContext,
    cluster: String,
    namespace: String,
    service: String,
) -> Result<()> {
    let versions = ctx
        .cluster()?
        .versions(&cluster, &namespace, &service)
        .await
        .with_context(|| format!("Failed to list versions of {}/{}", namespace, service))?;
    print_list(&versions, &format!("No deployments back {}/{}", namespace, service));
    Ok(())
}

fn print_list(items: &[String], empty: &str) {
    if items.is_empty() {
        ui::print_info(empty);
    }
    for item in items {
        println!("{}", item);
    }
}
