//! Authentication API handlers

use crate::error::Result;
use crate::middleware::Identity;
use crate::server::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

/// Session claims summary
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub session_id: Option<String>,
    pub issued_at: i64,
    pub expires_at: i64,
    pub issuer: String,
}

/// Get the caller's profile from the identity provider
pub async fn me(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> Result<impl IntoResponse> {
    let profile = state.provider.fetch_profile(&identity.subject).await?;
    Ok(Json(profile))
}

/// Get information about the current session
pub async fn session(Identity(identity): Identity) -> Result<impl IntoResponse> {
    Ok(Json(SessionInfo {
        user_id: identity.subject,
        session_id: identity.session_id,
        issued_at: identity.issued_at,
        expires_at: identity.expires_at,
        issuer: identity.issuer,
    }))
}
