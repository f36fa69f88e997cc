//! In-memory CRD backend and confirmation doubles for engine tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::domain::{
    DarknessReleaseId, EntityId, NewDarknessRelease, NewServiceEntity, ServiceEntity, ServiceType,
};
use crate::error::ApiError;
use crate::infrastructure::CrdApi;
use crate::services::ConfirmDestructive;

/// Backend call, in the order it was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListIds(String),
    GetEntity(EntityId),
    CreateEntity(String),
    DeleteEntity(EntityId),
    CreateDarkRelease(EntityId),
    DeleteDarkRelease(DarknessReleaseId),
}

#[derive(Default)]
struct State {
    next_id: i64,
    entities: BTreeMap<EntityId, ServiceEntity>,
    dark_releases: BTreeMap<DarknessReleaseId, NewDarknessRelease>,
    calls: Vec<Call>,
    created: Vec<NewServiceEntity>,
    created_dark: Vec<NewDarknessRelease>,
    deleted: Vec<EntityId>,

    list_failure: Option<u16>,
    detail_failures: Vec<EntityId>,
    delete_failures: Vec<EntityId>,
    create_failure: Option<(u16, String)>,

    // Deleted ids keep showing up in this many lists after a delete
    stale_lists: usize,
    stale_remaining: usize,
    ghosts: Vec<EntityId>,
}

/// Entities live in id order; the list endpoint returns them that way
#[derive(Default)]
pub struct InMemoryCrd {
    state: Mutex<State>,
}

fn backend(status: u16, body: &str) -> ApiError {
    ApiError::Backend {
        status,
        body: body.to_string(),
    }
}

impl InMemoryCrd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity under a fresh id and return it
    pub fn insert(&self, mut entity: ServiceEntity) -> EntityId {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        entity.id = state.next_id;
        state.entities.insert(entity.id, entity);
        state.next_id
    }

    pub fn fail_list_with(&self, status: u16) {
        self.state.lock().unwrap().list_failure = Some(status);
    }

    pub fn fail_detail(&self, id: EntityId) {
        self.state.lock().unwrap().detail_failures.push(id);
    }

    pub fn fail_delete(&self, id: EntityId) {
        self.state.lock().unwrap().delete_failures.push(id);
    }

    pub fn fail_create_with(&self, status: u16, body: &str) {
        self.state.lock().unwrap().create_failure = Some((status, body.to_string()));
    }

    pub fn keep_deleted_listed_for(&self, lists: usize) {
        self.state.lock().unwrap().stale_lists = lists;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created_entities(&self) -> Vec<NewServiceEntity> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn created_dark_releases(&self) -> Vec<NewDarknessRelease> {
        self.state.lock().unwrap().created_dark.clone()
    }

    pub fn deleted_entities(&self) -> Vec<EntityId> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn dark_release(&self, id: DarknessReleaseId) -> Option<NewDarknessRelease> {
        self.state.lock().unwrap().dark_releases.get(&id).cloned()
    }
}

impl CrdApi for InMemoryCrd {
    async fn list_entity_ids(&self, cluster: &str) -> Result<Vec<EntityId>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListIds(cluster.to_string()));
        if let Some(status) = state.list_failure {
            return Err(backend(status, "list failed"));
        }

        let mut ids: Vec<EntityId> = state.entities.keys().copied().collect();
        if state.stale_remaining > 0 {
            state.stale_remaining -= 1;
            ids.extend(state.ghosts.iter().copied());
            ids.sort_unstable();
        } else {
            state.ghosts.clear();
        }
        Ok(ids)
    }

    async fn get_entity(&self, id: EntityId) -> Result<ServiceEntity, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetEntity(id));
        if state.detail_failures.contains(&id) {
            return Err(backend(500, "detail failed"));
        }
        state
            .entities
            .get(&id)
            .cloned()
            .ok_or_else(|| backend(404, "service entity not found"))
    }

    async fn create_entity(
        &self,
        cluster: &str,
        entity: &NewServiceEntity,
    ) -> Result<EntityId, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateEntity(cluster.to_string()));
        if let Some((status, body)) = &state.create_failure {
            return Err(backend(*status, body));
        }

        state.next_id += 1;
        let id = state.next_id;
        state.entities.insert(
            id,
            ServiceEntity {
                id,
                name: entity.name.clone(),
                namespace: entity.namespace.clone(),
                service_type: entity.service_type,
                ratio: entity.ratio,
                commit_hash: entity.commit_hash.clone(),
                pod_scale: entity.pod_scale,
                ratio_schedules: entity.ratio_schedules.clone(),
                darkness_release_id: None,
                dependency_id: None,
            },
        );
        state.created.push(entity.clone());
        Ok(id)
    }

    async fn delete_entity(&self, id: EntityId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteEntity(id));
        if state.delete_failures.contains(&id) {
            return Err(backend(500, "delete failed"));
        }
        if state.entities.remove(&id).is_none() {
            return Err(backend(404, "service entity not found"));
        }

        state.dark_releases.retain(|_, r| r.service_entity_id != id);
        state.deleted.push(id);
        state.ghosts.push(id);
        state.stale_remaining = state.stale_lists;
        Ok(())
    }

    async fn create_dark_release(
        &self,
        _cluster: &str,
        release: &NewDarknessRelease,
    ) -> Result<DarknessReleaseId, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateDarkRelease(release.service_entity_id));

        state.next_id += 1;
        let id = state.next_id;
        match state.entities.get_mut(&release.service_entity_id) {
            Some(owner) => {
                // Only standard entities record their dark release
                if owner.service_type == ServiceType::StandardType {
                    owner.darkness_release_id = Some(id);
                }
            }
            None => return Err(backend(404, "service entity not found")),
        }
        state.dark_releases.insert(id, release.clone());
        state.created_dark.push(release.clone());
        Ok(id)
    }

    async fn delete_dark_release(&self, id: DarknessReleaseId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteDarkRelease(id));
        if state.dark_releases.remove(&id).is_none() {
            return Err(backend(404, "darkness release not found"));
        }
        for entity in state.entities.values_mut() {
            if entity.darkness_release_id == Some(id) {
                entity.darkness_release_id = None;
            }
        }
        Ok(())
    }
}

/// Entity with the given identity and versions; the id is assigned on insert
pub fn entity(name: &str, namespace: &str, service_type: ServiceType, versions: &[&str]) -> ServiceEntity {
    ServiceEntity {
        id: 0,
        name: name.to_string(),
        namespace: namespace.to_string(),
        service_type,
        ratio: (!service_type.is_standard()).then_some(50),
        commit_hash: versions.iter().map(|v| v.to_string()).collect(),
        pod_scale: None,
        ratio_schedules: None,
        darkness_release_id: None,
        dependency_id: None,
    }
}

/// Confirmation that answers the same way every time and remembers what it was asked
pub struct RecordingConfirm {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl RecordingConfirm {
    pub fn approving() -> Self {
        Self {
            answer: true,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            answer: false,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> usize {
        self.asked.lock().unwrap().len()
    }

    pub fn last_summary(&self) -> Option<String> {
        self.asked.lock().unwrap().last().cloned()
    }
}

impl ConfirmDestructive for RecordingConfirm {
    async fn confirm(&self, summary: &str) -> bool {
        self.asked.lock().unwrap().push(summary.to_string());
        self.answer
    }
}
