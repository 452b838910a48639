//! Access-code validation endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::core::access::{AccessGate, RejectReason, Verdict};
use crate::errors::AppError;
use crate::state::AppState;

/// Request body for POST /validate-code.
///
/// `code` is optional at the serde level so that a missing field becomes a
/// 400 with a usable message instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct ValidateCodeRequest {
    #[serde(default)]
    pub code: Option<String>,
    /// When true (the default) a valid code has one use spent; when false
    /// this is a pure check with no side effects.
    #[serde(default = "default_consume")]
    pub consume: bool,
}

fn default_consume() -> bool {
    true
}

/// Response body for POST /validate-code.
///
/// Rejected codes still answer 200: the lookup worked, the code simply does
/// not grant access, and the message is meant for direct display.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateCodeResponse {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    /// Uses left after this request; absent for unlimited codes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    /// Total recorded uses, present only when a use was consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_count: Option<u32>,
}

/// Handler for POST /validate-code - check an access code and, by default,
/// spend one use.
pub async fn validate_code(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateCodeRequest>,
) -> Result<Json<ValidateCodeResponse>, AppError> {
    let code = request
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("No code provided.".to_string()))?;

    let gate = AccessGate::new(state.store()?);
    let verdict = if request.consume {
        gate.redeem(code).await?
    } else {
        gate.check(code).await?
    };

    let response = match verdict {
        Verdict::Granted { record, used_count } => ValidateCodeResponse {
            valid: true,
            message: if used_count.is_some() {
                "Code validated and consumed.".to_string()
            } else {
                "Code is valid.".to_string()
            },
            reason: None,
            remaining: record.remaining(),
            used_count,
        },
        Verdict::Denied(reason) => {
            tracing::info!(reason = %reason, "access code rejected");
            ValidateCodeResponse {
                valid: false,
                message: reason.message().to_string(),
                reason: Some(reason),
                remaining: None,
                used_count: None,
            }
        }
    };

    Ok(Json(response))
}
