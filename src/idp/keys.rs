//! Signing key cache
//!
//! Fetches the identity provider's JWKS once and serves it from memory for
//! the rest of the process lifetime. The cache is a single slot with an
//! explicit populated state and a manual invalidation hook; there is no
//! TTL or refresh-on-miss. A key id that is absent from the cached set is
//! an error, not a trigger for a refetch.

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Key cache failures
#[derive(Error, Debug)]
pub enum KeyError {
    /// The JWKS endpoint timed out or could not be reached
    #[error("failed to reach JWKS endpoint: {0}")]
    Unavailable(String),

    /// The JWKS endpoint answered with something other than a key set
    #[error("invalid JWKS response: {0}")]
    UpstreamBody(String),

    /// No key in the cached set matches the token's `kid`
    #[error("no signing key found for kid: {0}")]
    KeyNotFound(String),

    /// The matching key could not be turned into a decoding key
    #[error("unsupported signing key for kid: {0}")]
    Unsupported(String),
}

/// Process-wide JWKS cache
#[derive(Clone)]
pub struct KeyCache {
    jwks_url: String,
    http_client: reqwest::Client,
    keys: Arc<RwLock<Option<JwkSet>>>,
}

impl KeyCache {
    pub fn new(jwks_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            jwks_url: jwks_url.into(),
            http_client,
            keys: Arc::new(RwLock::new(None)),
        }
    }

    /// Resolve the decoding key for a token's `kid`.
    pub async fn signing_key(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        let jwks = self.key_set().await?;

        let jwk = jwks
            .keys
            .iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .ok_or_else(|| KeyError::KeyNotFound(kid.to_string()))?;

        decoding_key(jwk, kid)
    }

    /// Drop the cached key set so the next lookup refetches.
    pub async fn invalidate(&self) {
        let mut slot = self.keys.write().await;
        *slot = None;
    }

    /// Whether the cache slot currently holds a key set.
    pub async fn is_populated(&self) -> bool {
        self.keys.read().await.is_some()
    }

    /// Return the cached key set, fetching it on first use. Concurrent
    /// cold-start fetches are tolerated; the last write wins.
    async fn key_set(&self) -> Result<JwkSet, KeyError> {
        {
            let slot = self.keys.read().await;
            if let Some(jwks) = &*slot {
                return Ok(jwks.clone());
            }
        }

        tracing::info!("Fetching JWKS from {}", self.jwks_url);
        let jwks = self.fetch().await?;

        {
            let mut slot = self.keys.write().await;
            *slot = Some(jwks.clone());
        }

        Ok(jwks)
    }

    async fn fetch(&self) -> Result<JwkSet, KeyError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| KeyError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KeyError::Unavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| KeyError::UpstreamBody(e.to_string()))
    }
}

fn decoding_key(jwk: &Jwk, kid: &str) -> Result<DecodingKey, KeyError> {
    DecodingKey::from_jwk(jwk).map_err(|e| {
        tracing::error!("Failed to build decoding key for kid {}: {}", kid, e);
        KeyError::Unsupported(kid.to_string())
    })
}
