//! Web-call creation endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::core::access::{AccessGate, Verdict};
use crate::core::voice::CallMetadata;
use crate::errors::AppError;
use crate::state::AppState;

/// Request body for POST /create-call.
///
/// Every field is optional at the serde level; required-field enforcement
/// happens in the handler so the caller gets a 400 naming the field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub access_code: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub attempt: Option<u32>,
}

/// Response body for POST /create-call: the provider's credential, passed
/// straight through.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCallResponse {
    pub access_token: String,
    pub call_id: String,
}

/// Response for GET /create-call, a deployment smoke check.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Handler for GET /create-call - liveness probe with no side effects.
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ready",
        message: "API endpoint is working!",
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

/// Handler for POST /create-call - validate the access code, create a web
/// call with the voice provider, then record the consumed use.
///
/// Ordering: the code is checked before the provider is contacted (an
/// invalid code never creates a call) but consumed only after the provider
/// granted the call. The failure windows this leaves open:
/// - provider fails after a successful check: no use is spent;
/// - consumption fails after the grant: the credential is still returned
///   and the miss is logged for reconciliation, since withholding a call
///   the provider already created helps nobody.
pub async fn create_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCallRequest>,
) -> Result<Json<CreateCallResponse>, AppError> {
    let name = required(request.name, "name")?;
    let email = required(request.email, "email")?;
    let access_code = required(request.access_code, "accessCode")?;
    let agent_id = required(request.agent_id, "agentId")?;

    let gate = AccessGate::new(state.store()?);
    let voice = state.voice()?;

    let record = match gate.check(&access_code).await? {
        Verdict::Granted { record, .. } => record,
        Verdict::Denied(reason) => {
            tracing::info!(reason = %reason, "call refused: access code rejected");
            return Err(AppError::CodeRejected(reason));
        }
    };

    tracing::info!(
        participant = %name,
        company = request.company.as_deref().unwrap_or("-"),
        agent_id = %agent_id,
        "call requested"
    );

    let metadata = CallMetadata {
        participant_name: name,
        company: request.company,
        email,
        scenario: "feedback".to_string(),
        persona: request.persona,
        attempt: request.attempt,
    };
    let credential = voice.create_call(&agent_id, &metadata).await?;

    if let Err(err) = gate.consume(&record).await {
        tracing::error!(
            record_id = %record.id,
            call_id = %credential.call_id,
            error = %err,
            "call granted but use count was not recorded"
        );
    }

    Ok(Json(CreateCallResponse {
        access_token: credential.access_token,
        call_id: credential.call_id,
    }))
}
