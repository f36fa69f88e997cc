//! Read side: current entities for display

use crate::domain::ServiceEntity;
use crate::error::ApiError;
use crate::infrastructure::CrdApi;

use super::locator::EntityLocator;

pub struct DeploymentReader<'a, C> {
    locator: EntityLocator<'a, C>,
}

impl<'a, C: CrdApi> DeploymentReader<'a, C> {
    pub fn new(crd: &'a C) -> Self {
        Self {
            locator: EntityLocator::new(crd),
        }
    }

    /// Every entity in the cluster; an unknown cluster has none
    pub async fn list(&self, cluster: &str) -> Result<Vec<ServiceEntity>, ApiError> {
        self.locator.list_all(cluster).await
    }

    /// The entity shown for a service: the standard one if present, else the canary one
    pub async fn find_for(
        &self,
        cluster: &str,
        namespace: &str,
        service: &str,
    ) -> Result<Option<ServiceEntity>, ApiError> {
        let located = self.locator.locate(cluster, namespace, service).await?;
        Ok(located.standard().or_else(|| located.canary()).cloned())
    }
}
