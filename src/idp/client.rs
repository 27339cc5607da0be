//! Identity provider user API client
//!
//! Fetches full user profiles from the provider's backend API. Used by the
//! auth middleware as the preferred profile source; callers are expected to
//! fall back to token claims when this lookup fails.

use crate::config::AuthConfig;
use crate::error::{AppError, Result};
use crate::idp::types::{ProviderProfile, ProviderUser};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Client for the provider's user API
#[derive(Clone)]
pub struct ProviderClient {
    api_url: String,
    api_secret: String,
    http_client: Client,
}

impl ProviderClient {
    pub fn new(config: &AuthConfig) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_secret: config.api_secret.clone(),
            http_client,
        }
    }

    /// Fetch a user's profile by their subject id.
    pub async fn fetch_profile(&self, subject: &str) -> Result<ProviderProfile> {
        let url = format!("{}/v1/users/{}", self.api_url, subject);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_secret)
            .send()
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("Failed to fetch profile: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "User {} not found at identity provider",
                subject
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::BadGateway(format!(
                "Profile lookup failed: {} - {}",
                status, body
            )));
        }

        let user: ProviderUser = response
            .json()
            .await
            .map_err(|e| AppError::BadGateway(format!("Failed to parse profile: {}", e)))?;

        Ok(user.into_profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_auth_config(api_url: &str) -> AuthConfig {
        AuthConfig {
            issuer: "https://issuer.test".to_string(),
            audience: "http://localhost:3000".to_string(),
            api_url: api_url.to_string(),
            api_secret: "sk_test_secret".to_string(),
            provider_timeout_secs: 5,
            protected_paths: vec![],
            exclude_paths: vec![],
        }
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/user_abc"))
            .and(header("authorization", "Bearer sk_test_secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user_abc",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "profile_image_url": "https://img.example.com/ada.png",
                "email_addresses": [
                    {"email_address": "ada@example.com", "primary": true}
                ]
            })))
            .mount(&server)
            .await;

        let client = ProviderClient::new(&test_auth_config(&server.uri()));
        let profile = client.fetch_profile("user_abc").await.unwrap();

        assert_eq!(profile.subject, "user_abc");
        assert_eq!(profile.email, Some("ada@example.com".to_string()));
        assert_eq!(profile.first_name, Some("Ada".to_string()));
        assert_eq!(
            profile.avatar_url,
            Some("https://img.example.com/ada.png".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/user_missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ProviderClient::new(&test_auth_config(&server.uri()));
        let result = client.fetch_profile("user_missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_profile_transport_error() {
        let client = ProviderClient::new(&test_auth_config("http://127.0.0.1:9"));
        let result = client.fetch_profile("user_abc").await;
        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_fetch_profile_bad_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/users/user_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "text/plain"))
            .mount(&server)
            .await;

        let client = ProviderClient::new(&test_auth_config(&server.uri()));
        let result = client.fetch_profile("user_abc").await;
        assert!(matches!(result, Err(AppError::BadGateway(_))));
    }
}
