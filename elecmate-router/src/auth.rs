//! Session credentials for router requests.
//!
//! Authenticated callers attach a bearer access token and the project API
//! key; unauthenticated consultations send neither header. An empty or
//! placeholder header is never sent.

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

/// Credentials from the caller's signed-in session, if any.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Session {
    /// Builds a session from a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() || self.api_key.is_some()
    }

    /// Attaches whichever credential headers this session actually has.
    pub(crate) fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        request
    }
}
