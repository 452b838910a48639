//! Health check and diagnostics handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use crate::state::AppState;

/// Response for GET /
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler for GET / - basic liveness, no auth, no side effects.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Which record-store configuration values are present, and what a live
/// probe against the store said. Secrets themselves are never echoed.
#[derive(Debug, Serialize)]
pub struct StoreDiagnostics {
    pub has_api_key: bool,
    pub has_base_id: bool,
    pub has_table_id: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeReport>,
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_seen: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handler for GET /diagnostics/store - verify record-store configuration
/// and reachability without touching any code record.
///
/// Always answers 200: a failed probe is the diagnostic result, not an
/// error of this endpoint.
pub async fn store_diagnostics(State(state): State<Arc<AppState>>) -> Json<StoreDiagnostics> {
    let config = &state.config;
    let mut diagnostics = StoreDiagnostics {
        has_api_key: config.airtable_api_key.is_some(),
        has_base_id: config.airtable_base_id.is_some(),
        has_table_id: config.airtable_table_id.is_some(),
        probe: None,
    };

    if let Ok(store) = state.store() {
        diagnostics.probe = Some(match store.probe().await {
            Ok(records_seen) => ProbeReport {
                ok: true,
                records_seen: Some(records_seen),
                error: None,
            },
            Err(e) => ProbeReport {
                ok: false,
                records_seen: None,
                error: Some(e.to_string()),
            },
        });
    }

    Json(diagnostics)
}
