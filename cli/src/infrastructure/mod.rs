//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that talks to the backend services:
//! - CRD service (service entities, dark releases)
//! - Cluster service (clusters, namespaces, services, deployments)
//! - Agent service (connectivity, optional)

pub mod agent;
pub mod cluster;
pub mod crd;
pub mod http;
pub mod session;

// Re-export commonly used types
pub use agent::AgentClient;
pub use cluster::ClusterClient;
pub use crd::{CrdApi, CrdClient};
pub use session::SessionContext;
