use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::info;

use crate::{
    auth::{self, IdentitySystem},
    dtos::{CreateSession, Session},
    error::AppError,
    extract::JsonBody,
    models::User,
    state::AppState,
};

/// Profile sync from the identity system. Replaces any stored profile.
pub async fn upsert(
    State(state): State<AppState>,
    _identity: IdentitySystem,
    JsonBody(user): JsonBody<User>,
) -> Result<Json<User>, AppError> {
    if user.id.trim().is_empty() {
        return Err(AppError::Validation("user id must not be empty".into()));
    }
    state.store.upsert_user(&user)?;
    info!("Stored profile for user {}", user.id);
    Ok(Json(user))
}

/// Opens a session on behalf of a user the identity system has signed in.
pub async fn login(
    State(state): State<AppState>,
    _identity: IdentitySystem,
    JsonBody(dto): JsonBody<CreateSession>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    let session = auth::issue_session(&state.store, &dto.user_id)?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Revokes the presented token; unknown tokens are accepted silently.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = auth::bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    auth::revoke_session(&state.store, token)?;
    Ok(StatusCode::NO_CONTENT)
}
