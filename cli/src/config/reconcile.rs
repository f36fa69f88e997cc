//! Reconciliation and enrichment tuning.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::ScheduleFormat;
use crate::error::ConfigError;

fn default_settle_delay() -> String {
    "1500ms".to_string()
}

fn default_poll_interval() -> String {
    "500ms".to_string()
}

fn default_poll_timeout() -> String {
    "10s".to_string()
}

fn default_agent_timeout() -> String {
    "5s".to_string()
}

/// Replace-or-create sequence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Wait after deletions before creating (backend list is eventually consistent)
    #[serde(default = "default_settle_delay")]
    pub settle_delay: String,

    /// Also poll the list endpoint until deleted ids disappear
    #[serde(default)]
    pub poll_until_absent: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: String,

    /// How ratio schedules are sent to the backend
    #[serde(default)]
    pub schedule_format: ScheduleFormat,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            settle_delay: default_settle_delay(),
            poll_until_absent: false,
            poll_interval: default_poll_interval(),
            poll_timeout: default_poll_timeout(),
            schedule_format: ScheduleFormat::default(),
        }
    }
}

/// Optional agent connectivity lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Give up on the lookup after this long and continue without it
    #[serde(default = "default_agent_timeout")]
    pub timeout: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            timeout: default_agent_timeout(),
        }
    }
}

/// Parsed settle behaviour handed to the reconcile engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub delay: Duration,
    /// `Some((interval, timeout))` when polling until deleted ids are gone
    pub poll: Option<(Duration, Duration)>,
}

impl SettlePolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay, poll: None }
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(1500))
    }
}

impl ReconcileConfig {
    pub fn settle_policy(&self) -> Result<SettlePolicy, ConfigError> {
        let delay = parse_duration("reconcile.settle_delay", &self.settle_delay)?;
        let poll = if self.poll_until_absent {
            Some((
                parse_duration("reconcile.poll_interval", &self.poll_interval)?,
                parse_duration("reconcile.poll_timeout", &self.poll_timeout)?,
            ))
        } else {
            None
        };
        Ok(SettlePolicy { delay, poll })
    }
}

impl AgentConfig {
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration("agent.timeout", &self.timeout)
    }
}

pub(crate) fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}
