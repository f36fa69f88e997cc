//! Backend service endpoints.

use serde::{Deserialize, Serialize};

fn default_cluster_api() -> String {
    "http://localhost:8082".to_string()
}

fn default_agent_api() -> String {
    "http://localhost:8081".to_string()
}

fn default_crd_api() -> String {
    "http://localhost:8084".to_string()
}

/// Base URLs of the cluster, agent and CRD services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Cluster service (clusters, namespaces, services, deployments)
    #[serde(default = "default_cluster_api")]
    pub cluster_api: String,

    /// Agent service (connected agents)
    #[serde(default = "default_agent_api")]
    pub agent_api: String,

    /// CRD service (service entities, dark releases)
    #[serde(default = "default_crd_api")]
    pub crd_api: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            cluster_api: default_cluster_api(),
            agent_api: default_agent_api(),
            crd_api: default_crd_api(),
        }
    }
}
