//! Command implementations
//!
//! One module per subcommand group. Mutating commands return an
//! `OperationSummary`; `main` prints it and sets the exit code.

pub mod clusters;
pub mod dark_release;
pub mod delete;
pub mod deploy;
pub mod entities;
pub mod workloads;

use anyhow::{Context, Result};
use indicatif::ProgressBar;

use crate::config::MeshConfig;
use crate::infrastructure::{AgentClient, ClusterClient, CrdClient, SessionContext};
use crate::services::{ConfirmPolicy, ReconcileEngine};
use crate::ui;

/// Everything a command needs, built once in `main`
pub struct AppContext {
    pub config: MeshConfig,
    pub session: SessionContext,
    pub confirm: ConfirmPolicy,
}

impl AppContext {
    pub fn crd(&self) -> Result<CrdClient> {
        CrdClient::new(&self.config.endpoints.crd_api, self.session.clone())
            .context("Failed to create CRD service client")
    }

    pub fn cluster(&self) -> Result<ClusterClient> {
        ClusterClient::new(&self.config.endpoints.cluster_api, self.session.clone())
            .context("Failed to create cluster service client")
    }

    pub fn agent(&self) -> Result<AgentClient> {
        let timeout = self.config.agent.timeout()?;
        AgentClient::new(&self.config.endpoints.agent_api, self.session.clone(), timeout)
            .context("Failed to create agent service client")
    }

    pub fn engine(&self) -> Result<ReconcileEngine<CrdClient, ConfirmPolicy>> {
        let settle = self.config.reconcile.settle_policy()?;
        Ok(ReconcileEngine::new(self.crd()?, self.confirm)
            .with_settle(settle)
            .with_schedule_format(self.config.reconcile.schedule_format))
    }

    /// Spinner for a long step, unless a prompt may need the terminal
    pub fn progress(&self, message: &str) -> Option<ProgressBar> {
        match self.confirm {
            ConfirmPolicy::Prompt => None,
            ConfirmPolicy::AutoApprove | ConfirmPolicy::AutoDeny => Some(ui::spinner(message)),
        }
    }
}

pub fn finish(progress: Option<ProgressBar>) {
    if let Some(spinner) = progress {
        spinner.finish_and_clear();
    }
}
