//! User API handlers

use crate::domain::{StringUuid, UpdateUserInput};
use crate::error::Result;
use crate::idp::ProviderProfile;
use crate::middleware::{CurrentUser, Identity};
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

/// Get user by internal id (unauthenticated direct lookup)
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let user = state.user_service.get(StringUuid::from(id)).await?;
    Ok(Json(user))
}

/// Get the reconciled local user for the caller
pub async fn me(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse> {
    Ok(Json(user))
}

/// Re-reconcile the caller, applying optional profile overrides from the
/// body on top of the token-derived profile.
pub async fn sync_me(
    State(state): State<AppState>,
    Identity(identity): Identity,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse> {
    let overrides: UpdateUserInput = if body.is_empty() {
        UpdateUserInput::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| crate::error::AppError::BadRequest(format!("Invalid body: {}", e)))?
    };
    overrides.validate()?;

    let base = identity.profile();
    let profile = ProviderProfile {
        subject: base.subject,
        email: base.email,
        first_name: overrides.first_name.or(base.first_name),
        last_name: overrides.last_name.or(base.last_name),
        avatar_url: overrides.avatar_url.or(base.avatar_url),
    };

    let user = state.user_service.reconcile(&profile).await?;
    Ok(Json(user))
}

/// Soft-delete the caller's account
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse> {
    state.user_service.deactivate(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
