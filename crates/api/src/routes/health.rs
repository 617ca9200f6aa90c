//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::MediaStore;
use entity_store::EntityStore;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// GET /health
///
/// Opens and drops a store transaction, so a server that cannot reach its
/// database answers 503 instead of "ok".
pub async fn check<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
) -> (StatusCode, Json<HealthResponse>)
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    match state.store.begin().await {
        Ok(_tx) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                store: "reachable",
            }),
        ),
        Err(err) => {
            tracing::error!(error = %err, "health check could not reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    store: "unreachable",
                }),
            )
        }
    }
}
