//! Entity locator
//!
//! Finds the ServiceEntities that route a given (namespace, service) in a
//! cluster. The CRD service has no query by name, so this lists every id
//! for the cluster and fetches the details concurrently.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::{EntityId, ServiceEntity};
use crate::error::ApiError;
use crate::infrastructure::CrdApi;

/// Matches for one (namespace, service), grouped by routing family.
///
/// The backend does not stop two entities from sharing a slot, so every
/// match is kept; the slot representatives are the first in list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocatedEntities {
    pub standard: Vec<ServiceEntity>,
    pub canary_family: Vec<ServiceEntity>,
    /// Every match, in list order, including unknown service types
    pub all: Vec<ServiceEntity>,
}

impl LocatedEntities {
    pub fn standard(&self) -> Option<&ServiceEntity> {
        self.standard.first()
    }

    pub fn canary(&self) -> Option<&ServiceEntity> {
        self.canary_family.first()
    }

    /// True when either slot holds more than one entity
    pub fn is_ambiguous(&self) -> bool {
        self.standard.len() > 1 || self.canary_family.len() > 1
    }

    fn classify(matches: Vec<ServiceEntity>) -> Self {
        let standard = matches
            .iter()
            .filter(|e| e.service_type.is_standard())
            .cloned()
            .collect();
        let canary_family = matches
            .iter()
            .filter(|e| e.service_type.is_canary_family())
            .cloned()
            .collect();
        Self {
            standard,
            canary_family,
            all: matches,
        }
    }
}

pub struct EntityLocator<'a, C> {
    crd: &'a C,
}

impl<'a, C: CrdApi> EntityLocator<'a, C> {
    pub fn new(crd: &'a C) -> Self {
        Self { crd }
    }

    /// Entity ids for a cluster. A cluster the CRD service does not know
    /// yet has no entities; any other failure is reported.
    pub async fn entity_ids(&self, cluster: &str) -> Result<Vec<EntityId>, ApiError> {
        match self.crd.list_entity_ids(cluster).await {
            Ok(ids) => Ok(ids),
            Err(e) if e.is_not_found() => {
                debug!(cluster = %cluster, "Entity list not found, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Every entity in the cluster whose detail could be fetched, in list order.
    ///
    /// Details are fetched concurrently; a failed detail drops that entity
    /// only.
    pub async fn list_all(&self, cluster: &str) -> Result<Vec<ServiceEntity>, ApiError> {
        let ids = self.entity_ids(cluster).await?;
        let crd = self.crd;
        let fetches = ids.iter().map(|&id| async move { (id, crd.get_entity(id).await) });

        let entities = join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(cluster = %cluster, entity_id = id, error = %e, "Dropping entity whose detail could not be fetched");
                    None
                }
            })
            .collect();
        Ok(entities)
    }

    /// Entities routing `namespace/service` (exact, case-sensitive match)
    pub async fn locate(
        &self,
        cluster: &str,
        namespace: &str,
        service: &str,
    ) -> Result<LocatedEntities, ApiError> {
        let matches: Vec<ServiceEntity> = self
            .list_all(cluster)
            .await?
            .into_iter()
            .filter(|e| e.matches(namespace, service))
            .collect();

        let located = LocatedEntities::classify(matches);
        if located.is_ambiguous() {
            warn!(
                cluster = %cluster,
                namespace = %namespace,
                service = %service,
                standard = located.standard.len(),
                canary = located.canary_family.len(),
                "More than one entity occupies a routing slot"
            );
        }
        debug!(
            cluster = %cluster,
            namespace = %namespace,
            service = %service,
            matches = located.all.len(),
            "Located service entities"
        );
        Ok(located)
    }
}
