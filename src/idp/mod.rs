//! Identity provider integration
//!
//! The provider is the sole source of truth for identity claims. This
//! module holds the signing key cache, the user API client, and the
//! profile types shared between them.

pub mod client;
pub mod keys;
pub mod types;

pub use client::ProviderClient;
pub use keys::{KeyCache, KeyError};
pub use types::{ProviderProfile, ProviderUser};
