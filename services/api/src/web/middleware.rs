//! services/api/src/web/middleware.rs
//!
//! Credential middleware for protecting AI-backed routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Middleware that checks the active provider has an API key.
///
/// If it does, inserts the resolved `GatewayConfig` into request extensions for handlers to use.
/// If not, returns 412 Precondition Failed before any provider is contacted.
pub async fn require_credential(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let config = state.settings.lock().await.gateway_config().map_err(|e| {
        warn!("Rejected AI request to {}: {}", req.uri().path(), e);
        e
    })?;

    req.extensions_mut().insert(config);
    Ok(next.run(req).await)
}
