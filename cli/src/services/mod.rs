//! Services layer - orchestration logic
//!
//! This module coordinates between domain logic and infrastructure.
//! Services talk to the backends only through the `CrdApi` trait.

pub mod confirm;
pub mod locator;
pub mod locks;
pub mod reader;
pub mod reconcile;

// Re-export commonly used types
pub use confirm::{ConfirmDestructive, ConfirmPolicy};
pub use reader::DeploymentReader;
pub use reconcile::ReconcileEngine;
