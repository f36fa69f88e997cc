//! CRD service client
//!
//! The CRD service owns ServiceEntity and DarknessRelease records. It
//! exposes list/get/create/delete only; there is no update and no upsert,
//! which is why the reconcile engine sequences delete → settle → create.
//!
//! ## Configuration
//!
//! Base URL comes from `endpoints.crd_api` (`--crd-api`, `MESHCTL_CRD_API`).

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, check_status, join, json_body};
use super::session::SessionContext;
use crate::domain::envelope::{self, Envelope};
use crate::domain::{
    DarknessReleaseId, EntityId, NewDarknessRelease, NewServiceEntity, ServiceEntity,
};
use crate::error::ApiError;

/// Primitive operations of the CRD service.
///
/// Implementations report backend statuses verbatim (`ApiError::Backend`);
/// not-found policies belong to the callers.
pub trait CrdApi {
    /// `serviceEntityID` list for a cluster
    async fn list_entity_ids(&self, cluster: &str) -> Result<Vec<EntityId>, ApiError>;

    async fn get_entity(&self, id: EntityId) -> Result<ServiceEntity, ApiError>;

    async fn create_entity(
        &self,
        cluster: &str,
        entity: &NewServiceEntity,
    ) -> Result<EntityId, ApiError>;

    async fn delete_entity(&self, id: EntityId) -> Result<(), ApiError>;

    async fn create_dark_release(
        &self,
        cluster: &str,
        release: &NewDarknessRelease,
    ) -> Result<DarknessReleaseId, ApiError>;

    async fn delete_dark_release(&self, id: DarknessReleaseId) -> Result<(), ApiError>;
}

/// HTTP client for the CRD service
pub struct CrdClient {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl CrdClient {
    pub fn new(base_url: impl Into<String>, session: SessionContext) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(Duration::from_secs(30))?,
            base_url: base_url.into(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        join(&self.base_url, path)
    }
}

fn cluster_segment(cluster: &str) -> String {
    urlencoding::encode(cluster).into_owned()
}

impl CrdApi for CrdClient {
    async fn list_entity_ids(&self, cluster: &str) -> Result<Vec<EntityId>, ApiError> {
        let url = self.url(&format!("/api/v1/crd/{}/list", cluster_segment(cluster)));
        let response = self.session.authorize(self.client.get(&url)).send().await?;
        let body = json_body(check_status(response).await?).await?;
        let ids = envelope::entity_ids(body)?;
        debug!(cluster = %cluster, count = ids.len(), "Listed service entity ids");
        Ok(ids)
    }

    async fn get_entity(&self, id: EntityId) -> Result<ServiceEntity, ApiError> {
        let url = self.url(&format!("/api/v1/crd/service/{id}"));
        let response = self.session.authorize(self.client.get(&url)).send().await?;
        let body = json_body(check_status(response).await?).await?;

        let envelope = Envelope::decode(body)?;
        if envelope.is_legacy() {
            debug!(entity_id = id, "Service entity detail in legacy data envelope");
        }
        let mut entity: ServiceEntity = envelope.parse("service entity")?;
        // The requested id is authoritative; detail bodies need not echo it
        entity.id = id;
        Ok(entity)
    }

    async fn create_entity(
        &self,
        cluster: &str,
        entity: &NewServiceEntity,
    ) -> Result<EntityId, ApiError> {
        let url = self.url(&format!(
            "/api/v1/crd/{}/serviceEntity",
            cluster_segment(cluster)
        ));
        let response = self
            .session
            .authorize(self.client.post(&url))
            .json(entity)
            .send()
            .await?;
        let body = json_body(check_status(response).await?).await?;
        envelope::created_id(&body)
    }

    async fn delete_entity(&self, id: EntityId) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/v1/crd/service/{id}"));
        let response = self.session.authorize(self.client.delete(&url)).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn create_dark_release(
        &self,
        cluster: &str,
        release: &NewDarknessRelease,
    ) -> Result<DarknessReleaseId, ApiError> {
        let url = self.url(&format!(
            "/api/v1/crd/{}/darknessRelease",
            cluster_segment(cluster)
        ));
        let response = self
            .session
            .authorize(self.client.post(&url))
            .json(release)
            .send()
            .await?;
        let body = json_body(check_status(response).await?).await?;
        envelope::created_id(&body)
    }

    async fn delete_dark_release(&self, id: DarknessReleaseId) -> Result<(), ApiError> {
        let url = self.url(&format!("/api/v1/crd/darkness/{id}"));
        let response = self.session.authorize(self.client.delete(&url)).send().await?;
        check_status(response).await?;
        Ok(())
    }
}
