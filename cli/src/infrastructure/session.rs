//! Session context handed to every backend client
//!
//! The dashboard kept its token in browser storage; here it is passed in
//! explicitly (flag or `MESHCTL_TOKEN`) and never read from ambient state.

use reqwest::RequestBuilder;

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    token: Option<String>,
}

impl SessionContext {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Attach the bearer token, if any
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}
