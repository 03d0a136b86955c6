//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use cart_store::CartStore;
use checkout::OrderRepository;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub open_sessions: usize,
}

/// GET /health: returns service health and the number of open cart sessions.
pub async fn check<S, R>(
    State(state): State<Arc<AppState<S, R>>>,
) -> Json<HealthResponse>
where
    S: CartStore + Clone + 'static,
    R: OrderRepository + 'static,
{
    Json(HealthResponse {
        status: "ok",
        open_sessions: state.sessions.len().await,
    })
}
