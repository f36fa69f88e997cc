use anyhow::Result;
use tracing::info;

use super::{finish, AppContext};
use crate::domain::{DarkRelease, Operation, OperationSummary, ServiceKey};

/// Mirror traffic from `ip` to `version` on top of the current deployment
pub async fn execute(
    ctx: &AppContext,
    key: ServiceKey,
    version: String,
    ip: String,
) -> Result<OperationSummary> {
    let engine = ctx.engine()?;
    let release = DarkRelease { key, version, ip };
    let target = release.key.to_string();

    info!("🌑 Dark release of {} for {} from {}", release.version, target, release.ip);

    let progress = ctx.progress("Creating dark release...");
    let result = engine.create_dark_release(&release).await;
    finish(progress);

    Ok(match result {
        Ok(id) => OperationSummary::succeeded(
            Operation::DarkRelease,
            target,
            format!("dark release {} mirrors {} to {}", id, release.ip.trim(), release.version),
        ),
        Err(e) => OperationSummary::failed(Operation::DarkRelease, target, &e),
    })
}
