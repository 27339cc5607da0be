//! Organization API handlers

use crate::domain::{CreateOrganizationInput, UpdateOrganizationInput};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

/// Create an organization for the caller; the caller becomes its admin
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateOrganizationInput>,
) -> Result<impl IntoResponse> {
    let organization = state.organization_service.create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

/// Get the caller's organization
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse> {
    let organization = state.organization_service.get_for_user(user.id).await?;
    Ok(Json(organization))
}

/// Update the caller's organization
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<UpdateOrganizationInput>,
) -> Result<impl IntoResponse> {
    let organization = state
        .organization_service
        .update_for_user(user.id, input)
        .await?;
    Ok(Json(organization))
}

/// List the members of the caller's organization
pub async fn members(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse> {
    let users = state.organization_service.list_members(user.id).await?;
    Ok(Json(users))
}

/// Soft-delete the caller's organization and release its members
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse> {
    state.organization_service.delete_for_user(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
