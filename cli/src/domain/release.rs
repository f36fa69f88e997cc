//! Release request types
//!
//! Caller-side descriptions of standard, canary and dark releases, with
//! the local validation that runs before anything goes over the wire.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use super::entity::{NewDarknessRelease, NewServiceEntity, ServiceType, WireRatioSchedule};
use crate::error::ReconcileError;

/// Ceiling on schedule entries enforced by the backend
pub const MAX_RATIO_SCHEDULES: usize = 100;

/// Which side of a mesh key a release targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    pub cluster: String,
    pub namespace: String,
    pub service: String,
}

impl ServiceKey {
    pub fn new(
        cluster: impl Into<String>,
        namespace: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            namespace: namespace.into(),
            service: service.into(),
        }
    }
}

impl std::fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.service)
    }
}

/// One planned ratio change, relative to entity creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioSchedule {
    pub delay_ms: u64,
    pub new_ratio: u8,
}

impl RatioSchedule {
    pub fn new(delay: Duration, new_ratio: u8) -> Self {
        Self {
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            new_ratio,
        }
    }

    /// Parse `DELAY=RATIO`, e.g. `5m=30` or `90s=100`
    pub fn parse(input: &str) -> Result<Self, String> {
        let (delay, ratio) = input
            .split_once('=')
            .ok_or_else(|| format!("expected DELAY=RATIO, got '{input}'"))?;
        let delay = humantime::parse_duration(delay.trim())
            .map_err(|e| format!("invalid delay '{delay}': {e}"))?;
        let ratio = ratio
            .trim()
            .parse::<u8>()
            .map_err(|e| format!("invalid ratio '{ratio}': {e}"))?;
        Ok(Self::new(delay, ratio))
    }
}

/// How schedules are expressed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFormat {
    /// `{delayMs, newRatio}`
    #[default]
    DelayMs,
    /// `{triggerTime, newRatio}` with an absolute RFC 3339 time
    TriggerTime,
}

impl ScheduleFormat {
    pub fn translate(&self, schedules: &[RatioSchedule], now: DateTime<Utc>) -> Vec<WireRatioSchedule> {
        schedules
            .iter()
            .map(|s| match self {
                Self::DelayMs => WireRatioSchedule {
                    delay_ms: Some(s.delay_ms),
                    trigger_time: None,
                    new_ratio: s.new_ratio,
                },
                Self::TriggerTime => {
                    let millis = i64::try_from(s.delay_ms).unwrap_or(i64::MAX);
                    let at = now + chrono::Duration::milliseconds(millis);
                    WireRatioSchedule {
                        delay_ms: None,
                        trigger_time: Some(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
                        new_ratio: s.new_ratio,
                    }
                }
            })
            .collect()
    }
}

/// Standard deploy: one version takes all traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardRelease {
    pub key: ServiceKey,
    pub version: String,
}

impl StandardRelease {
    pub fn validate(&self) -> Result<(), ReconcileError> {
        validate_key(&self.key)?;
        if self.version.trim().is_empty() {
            return Err(ReconcileError::validation("version is required"));
        }
        Ok(())
    }

    pub fn to_entity(&self) -> NewServiceEntity {
        NewServiceEntity::standard(&self.key.namespace, &self.key.service, &self.version)
    }
}

/// Canary deploy: traffic split between two versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanaryRelease {
    pub key: ServiceKey,
    pub original_version: String,
    pub canary_version: String,
    pub ratio: u8,
    pub sticky: bool,
    pub pod_scale: Option<bool>,
    pub schedules: Option<Vec<RatioSchedule>>,
}

impl CanaryRelease {
    pub fn validate(&self) -> Result<(), ReconcileError> {
        validate_key(&self.key)?;
        if self.original_version.trim().is_empty() || self.canary_version.trim().is_empty() {
            return Err(ReconcileError::validation("both versions are required"));
        }
        if self.original_version == self.canary_version {
            return Err(ReconcileError::validation("need 2 distinct versions"));
        }
        if self.ratio > 100 {
            return Err(ReconcileError::validation(format!(
                "ratio {} is outside 0-100",
                self.ratio
            )));
        }
        if let Some(schedules) = &self.schedules {
            validate_schedules(schedules)?;
        }
        Ok(())
    }

    pub fn service_type(&self) -> ServiceType {
        ServiceType::canary(self.sticky)
    }

    pub fn to_entity(&self, format: ScheduleFormat, now: DateTime<Utc>) -> NewServiceEntity {
        NewServiceEntity {
            name: self.key.service.clone(),
            namespace: self.key.namespace.clone(),
            service_type: self.service_type(),
            ratio: Some(self.ratio),
            commit_hash: vec![self.original_version.clone(), self.canary_version.clone()],
            pod_scale: self.pod_scale,
            ratio_schedules: self
                .schedules
                .as_deref()
                .map(|schedules| format.translate(schedules, now)),
        }
    }
}

/// Shadow traffic from one source IP to a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DarkRelease {
    pub key: ServiceKey,
    pub version: String,
    pub ip: String,
}

impl DarkRelease {
    /// Checks that need no backend state
    pub fn validate(&self) -> Result<(), ReconcileError> {
        validate_key(&self.key)?;
        if self.version.trim().is_empty() {
            return Err(ReconcileError::validation("version is required"));
        }
        self.ip.trim().parse::<IpAddr>().map_err(|_| {
            ReconcileError::validation(format!("'{}' is not a valid IP address", self.ip))
        })?;
        Ok(())
    }

    /// The mirrored version must differ from everything the base entity serves
    pub fn validate_against(&self, base_versions: &[String]) -> Result<(), ReconcileError> {
        if base_versions.iter().any(|v| v == &self.version) {
            return Err(ReconcileError::validation(format!(
                "need 2 distinct versions: {} is already served by the base deployment",
                self.version
            )));
        }
        Ok(())
    }

    pub fn to_release(&self, service_entity_id: i64) -> NewDarknessRelease {
        NewDarknessRelease {
            service_entity_id,
            commit_hash: self.version.clone(),
            ips: vec![self.ip.trim().to_string()],
        }
    }
}

fn validate_key(key: &ServiceKey) -> Result<(), ReconcileError> {
    let mut missing = Vec::new();
    if key.cluster.trim().is_empty() {
        missing.push("cluster");
    }
    if key.namespace.trim().is_empty() {
        missing.push("namespace");
    }
    if key.service.trim().is_empty() {
        missing.push("service");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::validation(format!(
            "missing {}",
            missing.join(", ")
        )))
    }
}

fn validate_schedules(schedules: &[RatioSchedule]) -> Result<(), ReconcileError> {
    if schedules.len() > MAX_RATIO_SCHEDULES {
        return Err(ReconcileError::validation(format!(
            "at most {MAX_RATIO_SCHEDULES} schedules allowed, got {}",
            schedules.len()
        )));
    }

    let mut seen = HashSet::new();
    for schedule in schedules {
        if schedule.delay_ms == 0 {
            return Err(ReconcileError::validation("schedule delay must be positive"));
        }
        if schedule.new_ratio > 100 {
            return Err(ReconcileError::validation(format!(
                "schedule ratio {} is outside 0-100",
                schedule.new_ratio
            )));
        }
        if !seen.insert(schedule.delay_ms) {
            return Err(ReconcileError::validation("duplicate schedule time"));
        }
    }
    Ok(())
}
