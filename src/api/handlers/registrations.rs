//! Registration listing.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{RegistrationDto, RegistrationListResponse, RegistrationQuery};
use crate::app_state::AppState;
use crate::domain::Role;
use crate::error::RegistrarError;

/// `GET /registrations` — registrations matching an optional role and topic.
///
/// # Errors
///
/// Returns [`RegistrarError::InvalidRequest`] for an unknown role or a
/// malformed topic.
pub async fn list_registrations(
    State(state): State<AppState>,
    Query(query): Query<RegistrationQuery>,
) -> Result<impl IntoResponse, RegistrarError> {
    let role = query.role_filter()?;
    let topic = query.topic_filter()?;

    let mut found = match (role, topic) {
        (None, None) => state.store.export().await,
        (Some(role), None) => state.store.export_role(role).await,
        (role, Some(topic)) => {
            let roles = role.map_or_else(|| Role::ALL.to_vec(), |r| vec![r]);
            let mut found = Vec::new();
            for role in roles {
                found.extend(state.store.find(role, &topic).await);
            }
            found
        }
    };
    found.sort_by(|a, b| a.key().cmp(&b.key()));

    let count = found.len();
    let (page, pagination) = query.pagination().apply(found);
    let data: Vec<RegistrationDto> = page.into_iter().map(RegistrationDto::from).collect();

    Ok(Json(RegistrationListResponse {
        count,
        data,
        pagination,
    }))
}

/// Registration routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/registrations", get(list_registrations))
}
