use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{access, api, call};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// CORS (including OPTIONS preflight) is layered on in main.rs where the
/// configured origins are available.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/validate-code", post(access::validate_code))
        .route("/create-call", post(call::create_call).get(call::liveness))
        .route("/diagnostics/store", get(api::store_diagnostics))
        .layer(TraceLayer::new_for_http())
}
