//! Delete by id
//!
//! Ids that are already gone count as deleted.

use anyhow::Result;

use super::AppContext;
use crate::domain::{DarknessReleaseId, EntityId, Operation, OperationSummary};

pub async fn execute_entity(ctx: &AppContext, id: EntityId) -> Result<OperationSummary> {
    let engine = ctx.engine()?;
    let target = format!("service entity {id}");

    Ok(match engine.delete(id).await {
        Ok(()) => OperationSummary::succeeded(Operation::DeleteEntity, target, "removed"),
        Err(e) => OperationSummary::failed(Operation::DeleteEntity, target, &e),
    })
}

pub async fn execute_dark_release(
    ctx: &AppContext,
    id: DarknessReleaseId,
) -> Result<OperationSummary> {
    let engine = ctx.engine()?;
    let target = format!("dark release {id}");

    Ok(match engine.delete_dark_release(id).await {
        Ok(()) => OperationSummary::succeeded(Operation::DeleteDarkRelease, target, "removed"),
        Err(e) => OperationSummary::failed(Operation::DeleteDarkRelease, target, &e),
    })
}
