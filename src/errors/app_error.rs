//! Application error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::core::access::{GateError, RejectReason, StoreError};
use crate::core::voice::VoiceError;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a handler can return, one variant per API error code.
///
/// Code rejections (`NOT_FOUND`/`EXPIRED`/`EXHAUSTED`) only become an
/// `AppError` on the call-creation path; the validate endpoint reports them
/// in a 200 body instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed request input.
    #[error("{0}")]
    BadRequest(String),
    /// The access code does not grant a call.
    #[error("{}", .0.message())]
    CodeRejected(RejectReason),
    /// A required credential or identifier is absent from the deployment
    /// configuration.
    #[error("server configuration missing: {0}")]
    ConfigMissing(&'static str),
    /// The record store could not be read.
    #[error("record store lookup failed: {0}")]
    LookupFailed(StoreError),
    /// The code validated but the use-count update was rejected.
    #[error("failed to consume access code: {0}")]
    ConsumeFailed(StoreError),
    /// The voice provider rejected or failed the call-creation request.
    #[error("voice provider error ({status})")]
    Upstream { status: u16, detail: String },
    /// Anything unexpected.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable identifier, used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::CodeRejected(reason) => reason.kind(),
            Self::ConfigMissing(_) => "SERVER_CONFIG_MISSING",
            Self::LookupFailed(_) => "LOOKUP_FAILED",
            Self::ConsumeFailed(_) => "CONSUME_FAILED",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::CodeRejected(_) => StatusCode::FORBIDDEN,
            Self::ConfigMissing(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::LookupFailed(_) | Self::ConsumeFailed(_) => StatusCode::BAD_GATEWAY,
            // Forward the provider's own status so the operator sees what the
            // provider actually said; unmappable values fall back to 502.
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Lookup(e) => Self::LookupFailed(e),
            GateError::Consume(e) => Self::ConsumeFailed(e),
        }
    }
}

impl From<VoiceError> for AppError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::Upstream { status, body } => Self::Upstream {
                status,
                detail: body,
            },
            // No usable upstream status: the gateway itself failed to get a
            // valid response, which is exactly what 502 means.
            VoiceError::Transport(msg) | VoiceError::Malformed(msg) => Self::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                detail: msg,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
            }
            AppError::Upstream { status, detail } => {
                tracing::error!(status, detail = %detail, "voice provider error");
            }
            AppError::LookupFailed(e) | AppError::ConsumeFailed(e) => {
                tracing::error!(error = %e, kind = self.kind(), "record store error");
            }
            _ => {}
        }

        let mut body = serde_json::json!({
            "code": self.kind(),
            "message": self.to_string(),
        });
        if let AppError::Upstream { status, detail } = &self {
            body["status"] = serde_json::json!(status);
            body["detail"] = serde_json::json!(detail);
        }

        (self.status(), axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn response_parts(error: AppError) -> (StatusCode, serde_json::Value) {
        let resp = error.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn bad_request_maps_to_400() {
        let (status, body) =
            response_parts(AppError::BadRequest("agentId is required".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["message"], "agentId is required");
    }

    #[tokio::test]
    async fn rejected_code_maps_to_403_with_reason_kind() {
        let (status, body) =
            response_parts(AppError::CodeRejected(RejectReason::Exhausted)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "EXHAUSTED");
        assert_eq!(body["message"], "This code has no uses left.");
    }

    #[tokio::test]
    async fn config_missing_maps_to_500() {
        let (status, body) = response_parts(AppError::ConfigMissing("RETELL_API_KEY")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "SERVER_CONFIG_MISSING");
    }

    #[tokio::test]
    async fn store_failures_map_to_502() {
        let (status, body) = response_parts(AppError::LookupFailed(StoreError::Transport(
            "connection refused".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "LOOKUP_FAILED");

        let (status, body) = response_parts(AppError::ConsumeFailed(StoreError::Rejected {
            status: 422,
            body: "INVALID_VALUE_FOR_COLUMN".to_string(),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "CONSUME_FAILED");
    }

    #[tokio::test]
    async fn upstream_error_forwards_provider_status_and_body() {
        let (status, body) = response_parts(AppError::Upstream {
            status: 500,
            detail: r#"{"error_message": "agent not found"}"#.to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "UPSTREAM_ERROR");
        assert_eq!(body["status"], 500);
        assert_eq!(body["detail"], r#"{"error_message": "agent not found"}"#);
    }

    #[tokio::test]
    async fn unmappable_upstream_status_falls_back_to_502() {
        let (status, _) = response_parts(AppError::Upstream {
            status: 42,
            detail: String::new(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn gate_errors_split_into_lookup_and_consume() {
        let lookup: AppError =
            GateError::Lookup(StoreError::Transport("timeout".to_string())).into();
        assert_eq!(lookup.kind(), "LOOKUP_FAILED");

        let consume: AppError = GateError::Consume(StoreError::Rejected {
            status: 403,
            body: String::new(),
        })
        .into();
        assert_eq!(consume.kind(), "CONSUME_FAILED");
    }

    #[test]
    fn voice_transport_failure_becomes_a_502_upstream_error() {
        let err: AppError = VoiceError::Transport("dns error".to_string()).into();
        let AppError::Upstream { status, detail } = err else {
            panic!("expected upstream");
        };
        assert_eq!(status, 502);
        assert_eq!(detail, "dns error");
    }
}
