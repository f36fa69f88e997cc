//! Human-readable outcome of a mutating operation

use crate::error::ReconcileError;

/// Operations that produce a summary line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    StandardDeploy,
    CanaryDeploy,
    DarkRelease,
    DeleteEntity,
    DeleteDarkRelease,
    DeleteCluster,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StandardDeploy => "Standard deploy",
            Self::CanaryDeploy => "Canary deploy",
            Self::DarkRelease => "Dark release",
            Self::DeleteEntity => "Delete service entity",
            Self::DeleteDarkRelease => "Delete dark release",
            Self::DeleteCluster => "Delete cluster",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded(String),
    Failed {
        reason: String,
        backend_message: Option<String>,
    },
}

/// Single-line report of what happened to which workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSummary {
    pub operation: Operation,
    /// `namespace/service`, or the target id for by-id operations
    pub target: String,
    pub outcome: Outcome,
}

impl OperationSummary {
    pub fn succeeded(operation: Operation, target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
            outcome: Outcome::Succeeded(detail.into()),
        }
    }

    pub fn failed(operation: Operation, target: impl Into<String>, err: &ReconcileError) -> Self {
        Self {
            operation,
            target: target.into(),
            outcome: Outcome::Failed {
                reason: err.to_string(),
                backend_message: err.backend_body().map(str::to_string),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded(_))
    }
}

impl std::fmt::Display for OperationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            Outcome::Succeeded(detail) => {
                write!(f, "{} succeeded for {}: {}", self.operation.name(), self.target, detail)
            }
            Outcome::Failed {
                reason,
                backend_message,
            } => {
                write!(f, "{} failed for {}: {}", self.operation.name(), self.target, reason)?;
                // Backend reasons already embed the body
                if let Some(message) = backend_message {
                    if !reason.contains(message.as_str()) {
                        write!(f, " (backend: {message})")?;
                    }
                }
                Ok(())
            }
        }
    }
}
