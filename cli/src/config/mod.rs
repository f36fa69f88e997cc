//! # meshctl Configuration
//!
//! Layered configuration: built-in defaults → `meshctl.yaml` → flags and
//! environment variables.
//!
//! ## Example `meshctl.yaml`
//!
//! ```yaml
//! endpoints:
//!   cluster_api: http://cluster-service:8082
//!   agent_api: http://agent-service:8081
//!   crd_api: http://crd-service:8084
//! reconcile:
//!   settle_delay: 1500ms
//!   poll_until_absent: true
//!   schedule_format: delay_ms
//! agent:
//!   timeout: 5s
//! ```

mod endpoints;
mod reconcile;

pub use endpoints::EndpointsConfig;
pub use reconcile::{AgentConfig, ReconcileConfig, SettlePolicy};

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::ConfigError;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "meshctl.yaml";

/// Complete meshctl configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshConfig {
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cluster_api: Option<String>,
    pub agent_api: Option<String>,
    pub crd_api: Option<String>,
    pub settle_delay: Option<String>,
}

impl MeshConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `meshctl.yaml` in the
    /// working directory is used when present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                Self::from_file(path)
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::ParseError { message } => ConfigError::ParseError {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty file deserializes to null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Flags and environment variables win over the file
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(url) = overrides.cluster_api {
            self.endpoints.cluster_api = url;
        }
        if let Some(url) = overrides.agent_api {
            self.endpoints.agent_api = url;
        }
        if let Some(url) = overrides.crd_api {
            self.endpoints.crd_api = url;
        }
        if let Some(delay) = overrides.settle_delay {
            self.reconcile.settle_delay = delay;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values that would only fail later, mid-operation
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, url) in [
            ("endpoints.cluster_api", &self.endpoints.cluster_api),
            ("endpoints.agent_api", &self.endpoints.agent_api),
            ("endpoints.crd_api", &self.endpoints.crd_api),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: url.clone(),
                });
            }
        }
        self.reconcile.settle_policy()?;
        self.agent.timeout()?;
        Ok(())
    }
}
