//! Cluster service client
//!
//! Read-mostly view of registered clusters and the workloads inside them,
//! used to pick the (cluster, namespace, service, version) a release targets.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::http::{build_client, check_status, join, json_body};
use super::session::SessionContext;
use crate::domain::workload::{self, ClusterDetail, ClusterInfo, DeploymentInfo};
use crate::error::ApiError;

/// Service every namespace lists that is never a release target
const API_SERVER_SERVICE: &str = "kubernetes";

#[derive(Debug, Deserialize)]
struct ClusterList {
    #[serde(default)]
    data: Option<Vec<ClusterInfo>>,
}

#[derive(Debug, Deserialize)]
struct NamespaceList {
    #[serde(default)]
    namespaces: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceNameList {
    #[serde(default)]
    service_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DeploymentList {
    #[serde(default)]
    data: Vec<DeploymentInfo>,
}

/// HTTP client for the cluster service
pub struct ClusterClient {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl ClusterClient {
    pub fn new(base_url: impl Into<String>, session: SessionContext) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            base_url: base_url.into(),
            session,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<T, ApiError> {
        let url = join(&self.base_url, path);
        let response = self
            .session
            .authorize(self.client.get(&url).query(query))
            .send()
            .await?;
        let body = json_body(check_status(response).await?).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Protocol(format!("malformed {what}: {e}")))
    }

    /// Registered clusters; a missing `data` list means none
    pub async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, ApiError> {
        let list: ClusterList = self.get("/api/v1/cluster", &[], "cluster list").await?;
        Ok(list.data.unwrap_or_default())
    }

    /// Registration details, `None` when the cluster is unknown
    pub async fn cluster_details(&self, uuid: &str) -> Result<Option<ClusterDetail>, ApiError> {
        let path = format!("/api/v1/cluster/{}/details", urlencoding::encode(uuid));
        match self.get(&path, &[], "cluster details").await {
            Ok(detail) => Ok(Some(detail)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_cluster(&self, uuid: &str) -> Result<(), ApiError> {
        let url = join(
            &self.base_url,
            &format!("/api/v1/cluster/{}", urlencoding::encode(uuid)),
        );
        let response = self.session.authorize(self.client.delete(&url)).send().await?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn namespaces(&self, cluster: &str) -> Result<Vec<String>, ApiError> {
        let list: NamespaceList = self
            .get(
                "/api/v1/cluster/namespaces",
                &[("clusterId", cluster)],
                "namespace list",
            )
            .await?;
        Ok(list.namespaces)
    }

    /// Service names in a namespace, without the API server service
    pub async fn services(&self, cluster: &str, namespace: &str) -> Result<Vec<String>, ApiError> {
        let list: ServiceNameList = self
            .get(
                "/api/v1/cluster/services",
                &[("clusterId", cluster), ("namespace", namespace)],
                "service list",
            )
            .await?;
        Ok(list
            .service_names
            .into_iter()
            .filter(|name| name != API_SERVER_SERVICE)
            .collect())
    }

    pub async fn deployments(
        &self,
        cluster: &str,
        namespace: &str,
        service: &str,
    ) -> Result<Vec<DeploymentInfo>, ApiError> {
        let list: DeploymentList = self
            .get(
                "/api/v1/cluster/deployments",
                &[
                    ("clusterId", cluster),
                    ("namespace", namespace),
                    ("serviceName", service),
                ],
                "deployment list",
            )
            .await?;
        Ok(list.data)
    }

    /// Deployable versions, taken from the deployments' image tags
    pub async fn versions(
        &self,
        cluster: &str,
        namespace: &str,
        service: &str,
    ) -> Result<Vec<String>, ApiError> {
        let deployments = self.deployments(cluster, namespace, service).await?;
        Ok(workload::versions(&deployments))
    }
}
