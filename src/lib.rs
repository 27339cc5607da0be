//! Atrium API - User & Organization Service Backend
//!
//! This crate provides a REST API for user and organization records,
//! delegating identity verification to an external token issuer via JWT
//! validation against the issuer's published signing keys.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod idp;
pub mod jwt;
pub mod middleware;
pub mod migration;
pub mod repository;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
