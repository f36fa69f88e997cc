//! Destructive-action confirmation
//!
//! The reconcile engine asks before deleting a standard deployment. Who
//! answers (a person at a terminal, `--yes`, or an automated caller that
//! must never delete) is decided here, not in the engine.

use colored::Colorize;
use std::io::Write;
use tracing::{debug, warn};

pub trait ConfirmDestructive {
    /// `true` to proceed with the destructive step described by `summary`
    async fn confirm(&self, summary: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPolicy {
    /// Ask on the terminal, default no
    Prompt,
    AutoApprove,
    /// Safe default for unattended callers
    AutoDeny,
}

impl ConfirmPolicy {
    pub fn from_flags(yes: bool, non_interactive: bool) -> Self {
        match (yes, non_interactive) {
            (true, _) => Self::AutoApprove,
            (false, true) => Self::AutoDeny,
            (false, false) => Self::Prompt,
        }
    }
}

impl ConfirmDestructive for ConfirmPolicy {
    async fn confirm(&self, summary: &str) -> bool {
        match self {
            Self::AutoApprove => {
                debug!(summary = %summary, "Destructive step auto-approved");
                true
            }
            Self::AutoDeny => {
                debug!(summary = %summary, "Destructive step auto-denied");
                false
            }
            Self::Prompt => {
                let summary = summary.to_string();
                match tokio::task::spawn_blocking(move || prompt(&summary)).await {
                    Ok(Ok(answer)) => answer,
                    Ok(Err(e)) => {
                        warn!(error = %e, "Could not read confirmation, declining");
                        false
                    }
                    Err(e) => {
                        warn!(error = %e, "Confirmation prompt aborted, declining");
                        false
                    }
                }
            }
        }
    }
}

fn prompt(summary: &str) -> std::io::Result<bool> {
    println!("{}", summary.yellow());
    print!("Proceed? [y/N] ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(is_yes(&input))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
