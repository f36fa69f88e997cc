//! Reconcile engine - replace-or-create for mesh routing entities
//!
//! The CRD service only offers create, delete and list, so an upsert is
//! emulated as a sequence:
//!
//! 1. validate locally (nothing sent on failure)
//! 2. locate existing entities for the (namespace, service)
//! 3. pick the conflicting ones; ask before deleting a standard deployment
//! 4. delete them one by one, best effort
//! 5. settle (fixed delay, optionally poll until the ids are gone)
//! 6. create the new entity
//!
//! There is no compensation: once deletes start, the sequence runs to the
//! end or fails at the create. Sequences for the same key are serialized.

use chrono::Utc;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::confirm::ConfirmDestructive;
use super::locator::EntityLocator;
use super::locks::KeyedLocks;
use crate::config::SettlePolicy;
use crate::domain::{
    CanaryRelease, DarkRelease, DarknessReleaseId, EntityId, ScheduleFormat, ServiceEntity,
    ServiceKey, StandardRelease,
};
use crate::error::ReconcileError;
use crate::infrastructure::CrdApi;

pub struct ReconcileEngine<C, P> {
    crd: C,
    confirm: P,
    settle: SettlePolicy,
    schedule_format: ScheduleFormat,
    locks: KeyedLocks,
}

impl<C: CrdApi, P: ConfirmDestructive> ReconcileEngine<C, P> {
    pub fn new(crd: C, confirm: P) -> Self {
        Self {
            crd,
            confirm,
            settle: SettlePolicy::default(),
            schedule_format: ScheduleFormat::default(),
            locks: KeyedLocks::new(),
        }
    }

    /// Builder: set settle behaviour after deletions
    pub fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    /// Builder: set how ratio schedules are sent
    pub fn with_schedule_format(mut self, format: ScheduleFormat) -> Self {
        self.schedule_format = format;
        self
    }

    fn locator(&self) -> EntityLocator<'_, C> {
        EntityLocator::new(&self.crd)
    }

    /// Replace every standard deployment of the service with one serving `version`
    pub async fn upsert_standard(&self, release: &StandardRelease) -> Result<EntityId, ReconcileError> {
        release.validate()?;
        let key = &release.key;
        let _guard = self.locks.acquire(key).await;

        let located = self
            .locator()
            .locate(&key.cluster, &key.namespace, &key.service)
            .await?;

        let slated = located.standard.clone();
        if !slated.is_empty() {
            let summary = replacement_summary(
                key,
                &slated,
                &format!("standard deployment of {}", release.version),
            );
            self.require_confirmation(key, &summary).await?;
        }

        self.replace(key, &slated).await;

        let id = self.crd.create_entity(&key.cluster, &release.to_entity()).await?;
        info!(
            cluster = %key.cluster,
            namespace = %key.namespace,
            service = %key.service,
            entity_id = id,
            version = %release.version,
            "Created standard service entity"
        );
        Ok(id)
    }

    /// Replace the service's canary-family entity (and a bare standard
    /// deployment, if any) with a split between two versions
    pub async fn upsert_canary(&self, release: &CanaryRelease) -> Result<EntityId, ReconcileError> {
        release.validate()?;
        let key = &release.key;
        let _guard = self.locks.acquire(key).await;

        let located = self
            .locator()
            .locate(&key.cluster, &key.namespace, &key.service)
            .await?;

        // A standard deployment with a dark release attached stays put
        let bare_standard: Vec<ServiceEntity> = located
            .standard
            .iter()
            .filter(|e| !e.has_dark_release())
            .cloned()
            .collect();

        if !bare_standard.is_empty() {
            let summary = replacement_summary(
                key,
                &bare_standard,
                &format!(
                    "{} {} → {} at {}%",
                    release.service_type(),
                    release.original_version,
                    release.canary_version,
                    release.ratio
                ),
            );
            self.require_confirmation(key, &summary).await?;
        }

        let mut slated = located.canary_family.clone();
        slated.extend(bare_standard);
        self.replace(key, &slated).await;

        let entity = release.to_entity(self.schedule_format, Utc::now());
        let id = self.crd.create_entity(&key.cluster, &entity).await?;
        info!(
            cluster = %key.cluster,
            namespace = %key.namespace,
            service = %key.service,
            entity_id = id,
            service_type = %entity.service_type,
            ratio = release.ratio,
            schedules = entity.ratio_schedules.as_ref().map_or(0, Vec::len),
            "Created canary service entity"
        );
        Ok(id)
    }

    /// Mirror traffic from one IP to `version`, on top of the existing deployment.
    ///
    /// Never creates the owning entity: the standard deployment is used when
    /// present, the canary-family one otherwise.
    pub async fn create_dark_release(
        &self,
        release: &DarkRelease,
    ) -> Result<DarknessReleaseId, ReconcileError> {
        release.validate()?;
        let key = &release.key;
        let _guard = self.locks.acquire(key).await;

        let located = self
            .locator()
            .locate(&key.cluster, &key.namespace, &key.service)
            .await?;

        let base = located
            .standard()
            .or_else(|| located.canary())
            .ok_or_else(|| {
                ReconcileError::Precondition(format!("no base deployment for {key}"))
            })?;
        release.validate_against(&base.commit_hash)?;

        let id = self
            .crd
            .create_dark_release(&key.cluster, &release.to_release(base.id))
            .await?;
        info!(
            cluster = %key.cluster,
            namespace = %key.namespace,
            service = %key.service,
            entity_id = base.id,
            darkness_release_id = id,
            version = %release.version,
            "Created dark release"
        );
        Ok(id)
    }

    /// Delete a service entity; an id that is already gone is a success
    pub async fn delete(&self, id: EntityId) -> Result<(), ReconcileError> {
        match self.crd.delete_entity(id).await {
            Ok(()) => {
                info!(entity_id = id, "Deleted service entity");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(entity_id = id, "Service entity already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a dark release; the owning entity is left alone
    pub async fn delete_dark_release(&self, id: DarknessReleaseId) -> Result<(), ReconcileError> {
        match self.crd.delete_dark_release(id).await {
            Ok(()) => {
                info!(darkness_release_id = id, "Deleted dark release");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(darkness_release_id = id, "Dark release already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn require_confirmation(&self, key: &ServiceKey, summary: &str) -> Result<(), ReconcileError> {
        if self.confirm.confirm(summary).await {
            Ok(())
        } else {
            info!(namespace = %key.namespace, service = %key.service, "Replacement declined, nothing changed");
            Err(ReconcileError::ConflictDeletionDeclined(format!(
                "replacing the current deployment of {key}"
            )))
        }
    }

    /// Delete `slated` in order, then settle. Failures are logged and skipped.
    async fn replace(&self, key: &ServiceKey, slated: &[ServiceEntity]) {
        if slated.is_empty() {
            return;
        }

        let mut deleted = Vec::with_capacity(slated.len());
        for entity in slated {
            match self.crd.delete_entity(entity.id).await {
                Ok(()) => {
                    info!(
                        namespace = %key.namespace,
                        service = %key.service,
                        entity_id = entity.id,
                        service_type = %entity.service_type,
                        "Deleted conflicting service entity"
                    );
                    deleted.push(entity.id);
                }
                Err(e) if e.is_not_found() => deleted.push(entity.id),
                Err(e) => {
                    warn!(
                        namespace = %key.namespace,
                        service = %key.service,
                        entity_id = entity.id,
                        error = %e,
                        "Failed to delete conflicting service entity, continuing"
                    );
                }
            }
        }

        self.settle(&key.cluster, &deleted).await;
    }

    async fn settle(&self, cluster: &str, deleted: &[EntityId]) {
        if !self.settle.delay.is_zero() {
            debug!(delay_ms = self.settle.delay.as_millis() as u64, "Settling after deletions");
            sleep(self.settle.delay).await;
        }

        let Some((interval, limit)) = self.settle.poll else {
            return;
        };
        if deleted.is_empty() {
            return;
        }

        let started = Instant::now();
        let poll = async {
            loop {
                match self.locator().entity_ids(cluster).await {
                    Ok(ids) if !ids.iter().any(|id| deleted.contains(id)) => return,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Listing entities while settling failed, continuing");
                        return;
                    }
                }
                sleep(interval).await;
            }
        };

        match timeout(limit, poll).await {
            Ok(()) => debug!(
                waited_ms = started.elapsed().as_millis() as u64,
                "Deleted entities no longer listed"
            ),
            Err(_) => warn!(
                timeout_ms = limit.as_millis() as u64,
                "Deleted entities still listed after settle timeout, creating anyway"
            ),
        }
    }
}

fn replacement_summary(key: &ServiceKey, replaced: &[ServiceEntity], with: &str) -> String {
    let mut lines = vec![format!(
        "Replace {} existing deployment(s) of {} in cluster {} with {}:",
        replaced.len(),
        key,
        key.cluster,
        with
    )];
    for entity in replaced {
        lines.push(format!(
            "  - entity {} ({}, versions: {})",
            entity.id,
            entity.service_type,
            entity.commit_hash.join(", ")
        ));
        if let Some(dark) = entity.darkness_release_id {
            lines.push(format!(
                "    dark release {dark} attached to it will be deleted too"
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RatioSchedule, ServiceType};
    use crate::error::ApiError;
    use crate::services::locator::EntityLocator;
    use crate::test_support::{entity, Call, InMemoryCrd, RecordingConfirm};
    use std::time::Duration;

    fn key() -> ServiceKey {
        ServiceKey::new("c1", "default", "api")
    }

    fn engine(crd: InMemoryCrd, confirm: RecordingConfirm) -> ReconcileEngine<InMemoryCrd, RecordingConfirm> {
        ReconcileEngine::new(crd, confirm).with_settle(SettlePolicy::fixed(Duration::ZERO))
    }

    fn standard(version: &str) -> StandardRelease {
        StandardRelease {
            key: key(),
            version: version.into(),
        }
    }

    fn canary(original: &str, canary: &str, ratio: u8) -> CanaryRelease {
        CanaryRelease {
            key: key(),
            original_version: original.into(),
            canary_version: canary.into(),
            ratio,
            sticky: false,
            pod_scale: None,
            schedules: None,
        }
    }

    fn dark(version: &str, ip: &str) -> DarkRelease {
        DarkRelease {
            key: key(),
            version: version.into(),
            ip: ip.into(),
        }
    }

    async fn locate(engine: &ReconcileEngine<InMemoryCrd, RecordingConfirm>) -> crate::services::locator::LocatedEntities {
        EntityLocator::new(&engine.crd)
            .locate("c1", "default", "api")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_scenario_standard_then_canary_then_dark_release() {
        let engine = engine(InMemoryCrd::new(), RecordingConfirm::approving());

        // Fresh cluster: one standard entity
        let standard_id = engine.upsert_standard(&standard("v1")).await.unwrap();
        let located = locate(&engine).await;
        let slot = located.standard().unwrap();
        assert_eq!(slot.id, standard_id);
        assert_eq!(slot.commit_hash, vec!["v1"]);
        assert_eq!(engine.confirm.prompts(), 0);

        // Canary replaces the bare standard entity after confirmation
        let canary_id = engine.upsert_canary(&canary("v1", "v2", 20)).await.unwrap();
        assert_eq!(engine.confirm.prompts(), 1);
        assert!(engine.crd.deleted_entities().contains(&standard_id));
        let located = locate(&engine).await;
        assert!(located.standard().is_none());
        let slot = located.canary().unwrap();
        assert_eq!(slot.id, canary_id);
        assert_eq!(slot.service_type, ServiceType::CanaryType);
        assert_eq!(slot.ratio, Some(20));
        assert_eq!(slot.commit_hash, vec!["v1", "v2"]);

        // Dark release hangs off the canary entity
        let dark_id = engine.create_dark_release(&dark("v3", "10.0.0.5")).await.unwrap();
        let release = engine.crd.dark_release(dark_id).unwrap();
        assert_eq!(release.service_entity_id, canary_id);
        assert_eq!(release.ips, vec!["10.0.0.5"]);
        assert_eq!(release.commit_hash, "v3");
        assert_eq!(locate(&engine).await.canary().map(|e| e.id), Some(canary_id));
    }

    #[tokio::test]
    async fn test_identical_versions_rejected_before_any_call() {
        let engine = engine(InMemoryCrd::new(), RecordingConfirm::approving());

        let err = engine.upsert_canary(&canary("v1", "v1", 20)).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
        assert!(engine.crd.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_schedules_rejected_before_any_call() {
        let engine = engine(InMemoryCrd::new(), RecordingConfirm::approving());

        for schedules in [
            vec![RatioSchedule { delay_ms: 1_000, new_ratio: 30 }, RatioSchedule { delay_ms: 1_000, new_ratio: 50 }],
            vec![RatioSchedule { delay_ms: 0, new_ratio: 30 }],
            vec![RatioSchedule { delay_ms: 1_000, new_ratio: 101 }],
        ] {
            let mut release = canary("v1", "v2", 20);
            release.schedules = Some(schedules);
            let err = engine.upsert_canary(&release).await.unwrap_err();
            assert!(matches!(err, ReconcileError::Validation(_)));
        }
        assert!(engine.crd.calls().is_empty());
    }

    #[tokio::test]
    async fn test_declined_confirmation_changes_nothing() {
        let crd = InMemoryCrd::new();
        let existing = crd.insert(entity("api", "default", ServiceType::StandardType, &["v1"]));
        let engine = engine(crd, RecordingConfirm::declining());

        let err = engine.upsert_canary(&canary("v1", "v2", 20)).await.unwrap_err();
        assert!(matches!(err, ReconcileError::ConflictDeletionDeclined(_)));
        assert_eq!(engine.confirm.prompts(), 1);
        assert!(engine.crd.deleted_entities().is_empty());
        assert!(engine.crd.created_entities().is_empty());
        assert_eq!(locate(&engine).await.standard().map(|e| e.id), Some(existing));
    }

    #[tokio::test]
    async fn test_standard_with_dark_release_survives_canary() {
        let crd = InMemoryCrd::new();
        let mut with_dark = entity("api", "default", ServiceType::StandardType, &["v1"]);
        with_dark.darkness_release_id = Some(77);
        let kept = crd.insert(with_dark);
        let old_canary = crd.insert(entity("api", "default", ServiceType::StickyCanaryType, &["v1", "v2"]));
        let engine = engine(crd, RecordingConfirm::declining());

        // No bare standard entity, so nothing needs confirming
        let new_canary = engine.upsert_canary(&canary("v1", "v3", 50)).await.unwrap();
        assert_eq!(engine.confirm.prompts(), 0);
        assert_eq!(engine.crd.deleted_entities(), vec![old_canary]);

        let located = locate(&engine).await;
        assert_eq!(located.standard().map(|e| e.id), Some(kept));
        assert_eq!(located.canary().map(|e| e.id), Some(new_canary));
    }

    #[tokio::test]
    async fn test_canary_never_coexists_with_bare_standard() {
        let crd = InMemoryCrd::new();
        crd.insert(entity("api", "default", ServiceType::StandardType, &["v1"]));
        crd.insert(entity("api", "default", ServiceType::StandardType, &["v0"]));
        crd.insert(entity("api", "default", ServiceType::CanaryType, &["v0", "v1"]));
        let engine = engine(crd, RecordingConfirm::approving());

        engine.upsert_canary(&canary("v1", "v2", 10)).await.unwrap();

        let located = locate(&engine).await;
        assert!(located.standard.iter().all(|e| e.has_dark_release()));
        assert_eq!(located.canary_family.len(), 1);
        assert_eq!(engine.crd.deleted_entities().len(), 3);
    }

    #[tokio::test]
    async fn test_sticky_canary_with_schedules_is_sent_as_is() {
        let engine = engine(InMemoryCrd::new(), RecordingConfirm::approving());
        let mut release = canary("v1", "v2", 10);
        release.sticky = true;
        release.pod_scale = Some(true);
        release.schedules = Some(vec![
            RatioSchedule { delay_ms: 60_000, new_ratio: 50 },
            RatioSchedule { delay_ms: 120_000, new_ratio: 100 },
        ]);

        engine.upsert_canary(&release).await.unwrap();

        let created = engine.crd.created_entities();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].service_type, ServiceType::StickyCanaryType);
        assert_eq!(created[0].pod_scale, Some(true));
        let schedules = created[0].ratio_schedules.as_ref().unwrap();
        assert_eq!(schedules[0].delay_ms, Some(60_000));
        assert_eq!(schedules[1].new_ratio, 100);
    }

    #[tokio::test]
    async fn test_trigger_time_format_translates_schedules() {
        let engine = engine(InMemoryCrd::new(), RecordingConfirm::approving())
            .with_schedule_format(ScheduleFormat::TriggerTime);
        let mut release = canary("v1", "v2", 10);
        release.schedules = Some(vec![RatioSchedule { delay_ms: 60_000, new_ratio: 50 }]);

        engine.upsert_canary(&release).await.unwrap();

        let created = engine.crd.created_entities();
        let schedule = &created[0].ratio_schedules.as_ref().unwrap()[0];
        assert_eq!(schedule.delay_ms, None);
        assert!(schedule.trigger_time.as_deref().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_block_create() {
        let crd = InMemoryCrd::new();
        let stuck = crd.insert(entity("api", "default", ServiceType::CanaryType, &["v1", "v2"]));
        crd.fail_delete(stuck);
        let engine = engine(crd, RecordingConfirm::approving());

        let id = engine.upsert_canary(&canary("v1", "v3", 30)).await.unwrap();

        assert_ne!(id, stuck);
        let located = locate(&engine).await;
        let ids: Vec<_> = located.canary_family.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![stuck, id]);
    }

    #[tokio::test]
    async fn test_failed_create_is_surfaced_with_body() {
        let crd = InMemoryCrd::new();
        crd.fail_create_with(500, "admission webhook denied");
        let engine = engine(crd, RecordingConfirm::approving());

        let err = engine.upsert_standard(&standard("v1")).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Api(ApiError::Backend { status: 500, .. })
        ));
        assert_eq!(err.backend_body(), Some("admission webhook denied"));
    }

    #[tokio::test]
    async fn test_locate_failure_aborts_before_mutation() {
        let crd = InMemoryCrd::new();
        crd.fail_list_with(500);
        let engine = engine(crd, RecordingConfirm::approving());

        let err = engine.upsert_standard(&standard("v1")).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Api(ApiError::Backend { status: 500, .. })));
        assert!(engine.crd.created_entities().is_empty());
    }

    #[tokio::test]
    async fn test_redeploying_standard_asks_and_mentions_cascade() {
        let crd = InMemoryCrd::new();
        let mut with_dark = entity("api", "default", ServiceType::StandardType, &["v1"]);
        with_dark.darkness_release_id = Some(9);
        let old = crd.insert(with_dark);
        let engine = engine(crd, RecordingConfirm::approving());

        let new = engine.upsert_standard(&standard("v2")).await.unwrap();

        assert_eq!(engine.confirm.prompts(), 1);
        assert!(engine.confirm.last_summary().unwrap().contains("dark release 9"));
        assert_eq!(engine.crd.deleted_entities(), vec![old]);
        assert_eq!(locate(&engine).await.standard().map(|e| e.id), Some(new));
    }

    #[tokio::test]
    async fn test_standard_upsert_leaves_canary_alone() {
        let crd = InMemoryCrd::new();
        let canary_id = crd.insert(entity("api", "default", ServiceType::CanaryType, &["v1", "v2"]));
        let engine = engine(crd, RecordingConfirm::declining());

        engine.upsert_standard(&standard("v1")).await.unwrap();

        assert_eq!(engine.confirm.prompts(), 0);
        assert_eq!(locate(&engine).await.canary().map(|e| e.id), Some(canary_id));
    }

    #[tokio::test]
    async fn test_dark_release_without_base_is_precondition_error() {
        let engine = engine(InMemoryCrd::new(), RecordingConfirm::approving());

        let err = engine.create_dark_release(&dark("v3", "10.0.0.5")).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Precondition(_)));
        assert!(engine.crd.created_dark_releases().is_empty());
    }

    #[tokio::test]
    async fn test_dark_release_prefers_standard_base() {
        let crd = InMemoryCrd::new();
        let standard_id = crd.insert(entity("api", "default", ServiceType::StandardType, &["v1"]));
        crd.insert(entity("api", "default", ServiceType::CanaryType, &["v1", "v2"]));
        let engine = engine(crd, RecordingConfirm::approving());

        let id = engine.create_dark_release(&dark("v3", "10.0.0.5")).await.unwrap();
        assert_eq!(engine.crd.dark_release(id).unwrap().service_entity_id, standard_id);
        assert_eq!(
            locate(&engine).await.standard().unwrap().darkness_release_id,
            Some(id)
        );
    }

    #[tokio::test]
    async fn test_dark_release_of_served_version_rejected() {
        let crd = InMemoryCrd::new();
        crd.insert(entity("api", "default", ServiceType::StandardType, &["v1"]));
        let engine = engine(crd, RecordingConfirm::approving());

        let err = engine.create_dark_release(&dark("v1", "10.0.0.5")).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
        assert!(engine.crd.created_dark_releases().is_empty());
    }

    #[tokio::test]
    async fn test_dark_release_bad_ip_rejected_before_any_call() {
        let engine = engine(InMemoryCrd::new(), RecordingConfirm::approving());

        let err = engine.create_dark_release(&dark("v3", "not-an-ip")).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
        assert!(engine.crd.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_unknown_ids_succeeds() {
        let engine = engine(InMemoryCrd::new(), RecordingConfirm::approving());

        for id in [1, 42, 9_999] {
            engine.delete(id).await.unwrap();
            engine.delete_dark_release(id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_delete_server_error_is_surfaced() {
        let crd = InMemoryCrd::new();
        let id = crd.insert(entity("api", "default", ServiceType::StandardType, &["v1"]));
        crd.fail_delete(id);
        let engine = engine(crd, RecordingConfirm::approving());

        let err = engine.delete(id).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Api(ApiError::Backend { status: 500, .. })));
        assert!(err.backend_body().is_some());
    }

    #[tokio::test]
    async fn test_deleting_dark_release_keeps_owner() {
        let crd = InMemoryCrd::new();
        let owner = crd.insert(entity("api", "default", ServiceType::StandardType, &["v1"]));
        let engine = engine(crd, RecordingConfirm::approving());
        let dark_id = engine.create_dark_release(&dark("v2", "10.0.0.5")).await.unwrap();

        engine.delete_dark_release(dark_id).await.unwrap();
        assert!(engine.crd.dark_release(dark_id).is_none());
        assert_eq!(locate(&engine).await.standard().map(|e| e.id), Some(owner));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_waits_after_deletions_only() {
        let crd = InMemoryCrd::new();
        crd.insert(entity("api", "default", ServiceType::CanaryType, &["v1", "v2"]));
        let engine = ReconcileEngine::new(crd, RecordingConfirm::approving())
            .with_settle(SettlePolicy::fixed(Duration::from_millis(1500)));

        let started = Instant::now();
        engine.upsert_canary(&canary("v1", "v3", 10)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1500));

        // Nothing to replace for a different service: no wait
        let started = Instant::now();
        let release = CanaryRelease {
            key: ServiceKey::new("c1", "default", "web"),
            ..canary("v1", "v2", 10)
        };
        engine.upsert_canary(&release).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_polls_until_deleted_ids_disappear() {
        let crd = InMemoryCrd::new();
        let old = crd.insert(entity("api", "default", ServiceType::CanaryType, &["v1", "v2"]));
        crd.keep_deleted_listed_for(3);
        let engine = ReconcileEngine::new(crd, RecordingConfirm::approving()).with_settle(SettlePolicy {
            delay: Duration::ZERO,
            poll: Some((Duration::from_millis(100), Duration::from_secs(10))),
        });

        engine.upsert_canary(&canary("v1", "v3", 10)).await.unwrap();

        let lists_after_delete = engine
            .crd
            .calls()
            .iter()
            .skip_while(|c| **c != Call::DeleteEntity(old))
            .filter(|c| matches!(c, Call::ListIds(_)))
            .count();
        assert_eq!(lists_after_delete, 4);
        assert_eq!(engine.crd.created_entities().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_poll_timeout_still_creates() {
        let crd = InMemoryCrd::new();
        crd.insert(entity("api", "default", ServiceType::CanaryType, &["v1", "v2"]));
        crd.keep_deleted_listed_for(usize::MAX);
        let engine = ReconcileEngine::new(crd, RecordingConfirm::approving()).with_settle(SettlePolicy {
            delay: Duration::ZERO,
            poll: Some((Duration::from_millis(100), Duration::from_secs(1))),
        });

        engine.upsert_canary(&canary("v1", "v3", 10)).await.unwrap();
        assert_eq!(engine.crd.created_entities().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_canaries_for_same_service_leave_one() {
        let crd = InMemoryCrd::new();
        let old = crd.insert(entity("api", "default", ServiceType::CanaryType, &["v1", "v2"]));
        let engine = ReconcileEngine::new(crd, RecordingConfirm::approving())
            .with_settle(SettlePolicy::fixed(Duration::from_millis(1500)));

        let canary_a = canary("v1", "v3", 10);
        let canary_b = canary("v1", "v4", 20);
        let (first, second) = tokio::join!(
            engine.upsert_canary(&canary_a),
            engine.upsert_canary(&canary_b),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        let located = locate(&engine).await;
        assert_eq!(located.canary_family.len(), 1);
        assert_eq!(located.canary_family[0].id, second);
        assert_eq!(engine.crd.created_entities().len(), 2);
        assert_eq!(engine.crd.deleted_entities(), vec![old, first]);
    }
}
