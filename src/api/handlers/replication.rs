//! Replication status of the front-end node.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::error::RegistrarError;

/// `GET /replication` — replication loop stats.
///
/// # Errors
///
/// Returns [`RegistrarError::NotAvailable`] on a node that does not run the
/// replication loop.
pub async fn replication_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, RegistrarError> {
    let Some(monitor) = state.replication.as_ref() else {
        return Err(RegistrarError::NotAvailable(
            "replication runs only on the front-end node".to_string(),
        ));
    };
    Ok(Json(monitor.snapshot().await))
}

/// Replication routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/replication", get(replication_stats))
}
