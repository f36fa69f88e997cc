//! Current routing entities, optionally re-polled
//!
//! Read-only: goes through `DeploymentReader`, never prompts.

use anyhow::{Context, Result};
use colored::Colorize;
use std::time::Duration;
use tracing::{debug, warn};

use super::AppContext;
use crate::domain::{ServiceEntity, ServiceType};
use crate::infrastructure::CrdClient;
use crate::services::DeploymentReader;
use crate::ui;

/// What to show: the whole cluster, or the entity for one service
pub enum Selection {
    Cluster,
    Service { namespace: String, service: String },
}

pub async fn execute(
    ctx: &AppContext,
    cluster: String,
    selection: Selection,
    watch: Option<String>,
) -> Result<()> {
    let crd = ctx.crd()?;
    let reader = DeploymentReader::new(&crd);

    let Some(interval) = watch else {
        return show(&reader, &cluster, &selection).await;
    };
    let interval = humantime::parse_duration(&interval)
        .with_context(|| format!("Invalid watch interval '{}'", interval))?;
    let interval = interval.max(Duration::from_secs(1));

    loop {
        ui::print_header(&format!("Entities in {} (every {})", cluster, humantime::format_duration(interval)));
        // Transient failures should not end a watch
        if let Err(e) = show(&reader, &cluster, &selection).await {
            warn!(error = %e, "Refresh failed");
            ui::print_error(&format!("Refresh failed: {e:#}"));
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("Watch interrupted");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

async fn show(
    reader: &DeploymentReader<'_, CrdClient>,
    cluster: &str,
    selection: &Selection,
) -> Result<()> {
    match selection {
        Selection::Cluster => {
            let entities = reader
                .list(cluster)
                .await
                .with_context(|| format!("Failed to list entities in cluster {}", cluster))?;
            if entities.is_empty() {
                ui::print_info(&format!("No service entities in cluster {}", cluster));
            }
            for entity in &entities {
                println!("{}", render(entity));
            }
        }
        Selection::Service { namespace, service } => {
            let found = reader
                .find_for(cluster, namespace, service)
                .await
                .with_context(|| format!("Failed to look up {}/{}", namespace, service))?;
            match found {
                Some(entity) => println!("{}", render(&entity)),
                None => ui::print_info(&format!("{}/{} is not routed by any entity", namespace, service)),
            }
        }
    }
    Ok(())
}

/// One line per entity: id, key, type, versions, split, dark release
fn render(entity: &ServiceEntity) -> String {
    let kind = match entity.service_type {
        ServiceType::StandardType => entity.service_type.as_str().green(),
        ServiceType::CanaryType | ServiceType::StickyCanaryType => entity.service_type.as_str().yellow(),
        ServiceType::Unknown => entity.service_type.as_str().dimmed(),
    };

    let mut line = format!(
        "{:>6}  {}/{}  {}  [{}]",
        entity.id,
        entity.namespace,
        entity.name,
        kind,
        entity.commit_hash.join(", ")
    );
    if let Some(ratio) = entity.ratio {
        line.push_str(&format!("  ratio={}%", ratio));
    }
    if let Some(schedules) = entity.ratio_schedules.as_ref().filter(|s| !s.is_empty()) {
        line.push_str(&format!("  schedules={}", schedules.len()));
    }
    if let Some(dark) = entity.darkness_release_id {
        line.push_str(&format!("  dark-release={}", dark));
    }
    line
}
