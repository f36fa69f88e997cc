//! Shared HTTP plumbing for the backend clients

use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

use crate::error::ApiError;

/// Build a client with the connect/request timeouts used everywhere
pub fn build_client(timeout: Duration) -> Result<Client, ApiError> {
    Ok(Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

/// Join a base URL and a path without doubling slashes
pub fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Pass 2xx responses through; turn anything else into `ApiError::Backend`
pub async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(status = %status, body = %body, "Backend returned error status");
    Err(ApiError::Backend {
        status: status.as_u16(),
        body,
    })
}

/// Parse a JSON body, reporting shape problems as protocol errors
pub async fn json_body(response: Response) -> Result<serde_json::Value, ApiError> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Protocol(format!("invalid JSON body: {e}")))
}
