//! REST API handlers
//!
//! Thin controllers: extraction and status codes here, behavior in the
//! service layer.

pub mod auth;
pub mod health;
pub mod organization;
pub mod user;
