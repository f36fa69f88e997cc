//! Centralized error types for meshctl
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

/// Errors talking to the cluster, agent and CRD services
#[derive(Error, Debug)]
pub enum ApiError {
    /// Any non-2xx response. The body is kept verbatim for diagnostics.
    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// 2xx response with a shape we cannot use
    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Backend { status: 404, .. })
    }

    /// Raw backend message, when the failure carried one
    pub fn backend_body(&self) -> Option<&str> {
        match self {
            Self::Backend { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}

/// Failures of the replace-or-create sequence
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Bad caller input, raised before any network call
    #[error("validation failed: {0}")]
    Validation(String),

    /// A required dependent resource is missing
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("destructive change declined: {0}")]
    ConflictDeletionDeclined(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ReconcileError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn backend_body(&self) -> Option<&str> {
        match self {
            Self::Api(err) => err.backend_body(),
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },
}
