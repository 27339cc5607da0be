//! HTTP middleware
//!
//! - Bearer authentication middleware with path-policy gating
//! - `CurrentUser` / `Identity` extractors over the attached request context
//! - Sanitized trace spans

pub mod auth;
pub mod trace;

pub use auth::{
    auth_middleware, AuthState, CurrentUser, ExternalIdentity, Identity, PathPolicy,
    RequestIdentity,
};
pub use trace::SanitizedMakeSpan;
