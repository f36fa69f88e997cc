//! Standard and canary deploys
//!
//! Both replace whatever currently routes the service: a standard deploy
//! replaces the standard entity, a canary deploy replaces the canary one
//! (and a bare standard entity, after confirmation).

use anyhow::Result;
use tracing::info;

use super::{finish, AppContext};
use crate::domain::{
    CanaryRelease, Operation, OperationSummary, RatioSchedule, ServiceKey, StandardRelease,
};
use crate::error::ReconcileError;

pub async fn execute_standard(
    ctx: &AppContext,
    key: ServiceKey,
    version: String,
) -> Result<OperationSummary> {
    let engine = ctx.engine()?;
    let release = StandardRelease { key, version };
    let target = release.key.to_string();

    info!("🚀 Deploying {} to {} (cluster {})", release.version, target, release.key.cluster);

    let progress = ctx.progress("Replacing standard deployment...");
    let result = engine.upsert_standard(&release).await;
    finish(progress);

    Ok(match result {
        Ok(id) => OperationSummary::succeeded(
            Operation::StandardDeploy,
            target,
            format!("entity {} now serves {}", id, release.version),
        ),
        Err(e) => OperationSummary::failed(Operation::StandardDeploy, target, &e),
    })
}

/// Canary parameters as given on the command line
pub struct CanaryArgs {
    pub original: String,
    pub canary: String,
    pub ratio: u8,
    pub sticky: bool,
    pub pod_scale: bool,
    /// `DELAY=RATIO` entries, e.g. `5m=30`
    pub schedules: Vec<String>,
}

pub async fn execute_canary(
    ctx: &AppContext,
    key: ServiceKey,
    args: CanaryArgs,
) -> Result<OperationSummary> {
    let target = key.to_string();
    let release = match canary_release(key, args) {
        Ok(release) => release,
        Err(e) => return Ok(OperationSummary::failed(Operation::CanaryDeploy, target, &e)),
    };
    let engine = ctx.engine()?;

    info!(
        "🐤 Canary {} → {} at {}% for {} (cluster {})",
        release.original_version, release.canary_version, release.ratio, target, release.key.cluster
    );

    let progress = ctx.progress("Replacing canary deployment...");
    let result = engine.upsert_canary(&release).await;
    finish(progress);

    Ok(match result {
        Ok(id) => OperationSummary::succeeded(
            Operation::CanaryDeploy,
            target,
            format!(
                "entity {} splits {} / {} at {}%",
                id, release.original_version, release.canary_version, release.ratio
            ),
        ),
        Err(e) => OperationSummary::failed(Operation::CanaryDeploy, target, &e),
    })
}

fn canary_release(key: ServiceKey, args: CanaryArgs) -> Result<CanaryRelease, ReconcileError> {
    let schedules = if args.schedules.is_empty() {
        None
    } else {
        let parsed = args
            .schedules
            .iter()
            .map(|s| RatioSchedule::parse(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ReconcileError::validation)?;
        Some(parsed)
    };

    Ok(CanaryRelease {
        key,
        original_version: args.original,
        canary_version: args.canary,
        ratio: args.ratio,
        sticky: args.sticky,
        // Only sent when asked for
        pod_scale: args.pod_scale.then_some(true),
        schedules,
    })
}
