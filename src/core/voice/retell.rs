//! Retell voice provider implementation.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.retellai.com/v2/create-web-call`
//! - Auth: `Authorization: Bearer <api key>`
//! - Success body: `{access_token, call_id, ...}` (extra fields ignored)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{CallCredential, CallMetadata, VoiceBackend, VoiceError};

/// Retell API base URL.
pub const RETELL_API_URL: &str = "https://api.retellai.com";

/// Client for Retell's web-call creation API.
#[derive(Debug, Clone)]
pub struct RetellClient {
    http: reqwest::Client,
    api_key: String,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct CreateWebCallRequest<'a> {
    agent_id: &'a str,
    metadata: &'a CallMetadata,
}

#[derive(Debug, Deserialize)]
struct CreateWebCallResponse {
    access_token: String,
    call_id: String,
}

impl RetellClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        let base_url = Url::parse(RETELL_API_URL).expect("constant URL is valid");
        Self {
            http,
            api_key: api_key.into(),
            base_url,
        }
    }

    /// Point the client at a different API origin. Used by tests to target a
    /// local mock server.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn create_call_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("API base URL can be a base")
            .extend(["v2", "create-web-call"]);
        url
    }
}

#[async_trait]
impl VoiceBackend for RetellClient {
    async fn create_call(
        &self,
        agent_id: &str,
        metadata: &CallMetadata,
    ) -> Result<CallCredential, VoiceError> {
        let response = self
            .http
            .post(self.create_call_url())
            .bearer_auth(&self.api_key)
            .json(&CreateWebCallRequest { agent_id, metadata })
            .send()
            .await
            .map_err(|e| VoiceError::Transport(e.to_string()))?;

        let status = response.status();
        // The raw body is surfaced in both branches: as the upstream error
        // detail, or as context when a 2xx payload fails to decode.
        let body = response
            .text()
            .await
            .map_err(|e| VoiceError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(VoiceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CreateWebCallResponse = serde_json::from_str(&body)
            .map_err(|e| VoiceError::Malformed(format!("{e}: {body}")))?;
        Ok(CallCredential {
            access_token: parsed.access_token,
            call_id: parsed.call_id,
        })
    }
}
