//! Agent service client
//!
//! Agent connectivity is an optional enrichment: if the lookup times out
//! or fails, callers carry on without it.

use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use super::http::{build_client, check_status, join, json_body};
use super::session::SessionContext;
use crate::error::ApiError;

pub struct AgentClient {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl AgentClient {
    /// `timeout` bounds the whole lookup, including connect
    pub fn new(
        base_url: impl Into<String>,
        session: SessionContext,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            session,
        })
    }

    async fn fetch_connected(&self) -> Result<Vec<String>, ApiError> {
        let url = join(&self.base_url, "/api/v1/agent/connected");
        let response = self.session.authorize(self.client.get(&url)).send().await?;
        let body = json_body(check_status(response).await?).await?;
        serde_json::from_value(body)
            .map_err(|e| ApiError::Protocol(format!("malformed agent list: {e}")))
    }

    /// Names of connected agents, or `None` when the agent service is unavailable
    pub async fn connected_agents(&self) -> Option<Vec<String>> {
        match self.fetch_connected().await {
            Ok(agents) => Some(agents),
            Err(ApiError::Transport(e)) if e.is_timeout() => {
                warn!("Agent lookup timed out, continuing without connectivity status");
                None
            }
            Err(e) => {
                warn!(error = %e, "Agent lookup failed, continuing without connectivity status");
                None
            }
        }
    }
}
