//! Voice provider clients.
//!
//! The provider hosts the actual real-time speech session; this crate only
//! asks it to create a call and passes the short-lived credential through.

pub mod retell;

pub use retell::{RETELL_API_URL, RetellClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Participant details forwarded to the voice provider as call metadata.
///
/// Every field is an opaque tag from the provider's point of view; nothing
/// here is interpreted by this service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMetadata {
    pub participant_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub email: String,
    pub scenario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
}

/// Short-lived credential authorizing one client to join one live session.
/// Never persisted; handed straight back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCredential {
    pub access_token: String,
    pub call_id: String,
}

/// Failure creating a call with the voice provider.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// The request never completed.
    #[error("request to voice provider failed: {0}")]
    Transport(String),
    /// The provider rejected the request; status and raw body are kept for
    /// operator diagnosis.
    #[error("voice provider returned {status}")]
    Upstream { status: u16, body: String },
    /// The provider answered 2xx but the payload did not decode.
    #[error("malformed voice provider response: {0}")]
    Malformed(String),
}

/// Call creation against a voice provider.
#[async_trait]
pub trait VoiceBackend: Send + Sync {
    /// Request a new live call session for `agent_id`. The provider is the
    /// sole source of truth for the credential and call id.
    async fn create_call(
        &self,
        agent_id: &str,
        metadata: &CallMetadata,
    ) -> Result<CallCredential, VoiceError>;
}
