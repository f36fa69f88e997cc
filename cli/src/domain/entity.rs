//! Mesh routing entities
//!
//! Wire shapes of ServiceEntity and DarknessRelease as the CRD service
//! exposes them (camelCase, with a couple of upper-case `ID` suffixes).

use serde::{Deserialize, Serialize};

/// Backend-assigned ServiceEntity id
pub type EntityId = i64;

/// Backend-assigned DarknessRelease id
pub type DarknessReleaseId = i64;

/// Routing semantics of a ServiceEntity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    /// All traffic to a single version
    StandardType,
    /// Traffic split between original and canary by ratio
    CanaryType,
    /// Canary split with session affinity
    StickyCanaryType,
    /// Anything a newer backend may return that we do not route on
    #[serde(other)]
    Unknown,
}

impl ServiceType {
    pub fn canary(sticky: bool) -> Self {
        if sticky {
            Self::StickyCanaryType
        } else {
            Self::CanaryType
        }
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, Self::StandardType)
    }

    /// Canary-family types are mutually exclusive for a given service
    pub fn is_canary_family(&self) -> bool {
        matches!(self, Self::CanaryType | Self::StickyCanaryType)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StandardType => "StandardType",
            Self::CanaryType => "CanaryType",
            Self::StickyCanaryType => "StickyCanaryType",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ratio change on the backend-executed timeline, as sent and received.
///
/// Older backends expect an absolute `triggerTime`; newer ones accept the
/// relative `delayMs` directly. Exactly one of the two is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRatioSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_time: Option<String>,
    pub new_ratio: u8,
}

/// Mesh routing unit for one (namespace, service name) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntity {
    #[serde(default, alias = "ID")]
    pub id: EntityId,
    pub name: String,
    pub namespace: String,
    pub service_type: ServiceType,
    #[serde(default)]
    pub ratio: Option<u8>,
    #[serde(default)]
    pub commit_hash: Vec<String>,
    #[serde(default)]
    pub pod_scale: Option<bool>,
    #[serde(default)]
    pub ratio_schedules: Option<Vec<WireRatioSchedule>>,
    #[serde(default, rename = "darknessReleaseID")]
    pub darkness_release_id: Option<DarknessReleaseId>,
    #[serde(default, rename = "dependencyID")]
    pub dependency_id: Option<Vec<EntityId>>,
}

impl ServiceEntity {
    /// Exact, case-sensitive match on the logical workload identity
    pub fn matches(&self, namespace: &str, service: &str) -> bool {
        self.name == service && self.namespace == namespace
    }

    pub fn has_dark_release(&self) -> bool {
        self.darkness_release_id.is_some()
    }
}

/// Create body for `POST /api/v1/crd/{cluster}/serviceEntity`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewServiceEntity {
    pub name: String,
    pub namespace: String,
    pub service_type: ServiceType,
    /// Sent as `null` for standard deploys
    pub ratio: Option<u8>,
    pub commit_hash: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_scale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio_schedules: Option<Vec<WireRatioSchedule>>,
}

impl NewServiceEntity {
    pub fn standard(
        namespace: impl Into<String>,
        service: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: service.into(),
            namespace: namespace.into(),
            service_type: ServiceType::StandardType,
            ratio: None,
            commit_hash: vec![version.into()],
            pod_scale: None,
            ratio_schedules: None,
        }
    }
}

/// Create body for `POST /api/v1/crd/{cluster}/darknessRelease`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDarknessRelease {
    pub service_entity_id: EntityId,
    pub commit_hash: String,
    pub ips: Vec<String>,
}
