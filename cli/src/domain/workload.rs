//! Cluster workload types
//!
//! Shapes returned by the cluster service, plus version discovery from
//! container image references.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registered cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub uuid: String,
    pub name: String,
}

/// Cluster registration details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDetail {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub prometheus_url: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
}

/// Deployment backing a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub name: String,
    #[serde(default)]
    pub containers: Vec<ContainerInfo>,
    #[serde(default)]
    pub pod_labels: HashMap<String, String>,
    #[serde(default)]
    pub replicas: i32,
}

/// Tag of an image reference; `latest` when untagged.
///
/// A colon in the registry host (`host:5000/app`) is a port, not a tag,
/// and a trailing `@sha256:...` digest is ignored.
pub fn image_tag(image: &str) -> &str {
    let without_digest = image.split('@').next().unwrap_or(image);
    let last_segment_start = without_digest.rfind('/').map_or(0, |i| i + 1);
    match without_digest[last_segment_start..].rsplit_once(':') {
        Some((_, tag)) if !tag.is_empty() => tag,
        _ => "latest",
    }
}

/// Versions deployed for a service, de-duplicated in first-seen order
pub fn versions(deployments: &[DeploymentInfo]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for container in deployments.iter().flat_map(|d| &d.containers) {
        let tag = image_tag(&container.image);
        if !out.iter().any(|v| v == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
