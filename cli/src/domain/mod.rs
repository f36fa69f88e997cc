//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod entity;
pub mod envelope;
pub mod release;
pub mod summary;
pub mod workload;

// Re-export commonly used types
pub use entity::{
    DarknessReleaseId, EntityId, NewDarknessRelease, NewServiceEntity, ServiceEntity, ServiceType,
};
pub use release::{CanaryRelease, DarkRelease, RatioSchedule, ScheduleFormat, ServiceKey, StandardRelease};
pub use summary::{Operation, OperationSummary};
pub use workload::ClusterInfo;
