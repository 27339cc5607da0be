//! Configuration management for the Atrium API

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Identity provider configuration
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Identity provider configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Token issuer URL; the JWKS is published at
    /// `{issuer}/.well-known/jwks.json`
    pub issuer: String,
    /// Expected `aud` claim (the frontend origin)
    pub audience: String,
    /// Base URL of the provider's user API
    pub api_url: String,
    /// Secret key for the provider's user API
    pub api_secret: String,
    /// Timeout for provider calls (JWKS and profile fetches), in seconds
    pub provider_timeout_secs: u64,
    /// Regex patterns for routes that require a bearer token
    pub protected_paths: Vec<String>,
    /// Regex patterns for routes exempted from authentication.
    /// Exclusion wins over protection when both match.
    pub exclude_paths: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            auth: AuthConfig {
                issuer: env::var("AUTH_ISSUER").context("AUTH_ISSUER is required")?,
                audience: env::var("AUTH_AUDIENCE")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                api_url: env::var("AUTH_API_URL")
                    .unwrap_or_else(|_| "https://api.clerk.com".to_string()),
                api_secret: env::var("AUTH_API_SECRET").unwrap_or_default(),
                provider_timeout_secs: env::var("AUTH_PROVIDER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                protected_paths: env::var("AUTH_PROTECTED_PATHS")
                    .map(|s| split_patterns(&s))
                    .unwrap_or_else(|_| default_protected_paths()),
                exclude_paths: env::var("AUTH_EXCLUDE_PATHS")
                    .map(|s| split_patterns(&s))
                    .unwrap_or_else(|_| default_exclude_paths()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl AuthConfig {
    /// The provider's well-known JWKS endpoint
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer)
    }
}

fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn default_protected_paths() -> Vec<String> {
    vec![
        "^/api/v1/user/me".to_string(),
        "^/api/v1/auth/.*".to_string(),
        "^/api/v1/organization".to_string(),
    ]
}

fn default_exclude_paths() -> Vec<String> {
    // Direct record lookup by internal id stays unauthenticated
    vec!["^/api/v1/user/[^/]+$".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 8080,
            database: DatabaseConfig {
                url: "mysql://localhost/test".to_string(),
                max_connections: 10,
                min_connections: 2,
            },
            auth: AuthConfig {
                issuer: "https://witty-gecko-11.clerk.accounts.dev".to_string(),
                audience: "http://localhost:3000".to_string(),
                api_url: "https://api.clerk.com".to_string(),
                api_secret: "sk_test".to_string(),
                provider_timeout_secs: 5,
                protected_paths: default_protected_paths(),
                exclude_paths: default_exclude_paths(),
            },
        }
    }

    #[test]
    fn test_config_http_addr() {
        let config = test_config();
        assert_eq!(config.http_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_jwks_url() {
        let config = test_config();
        assert_eq!(
            config.auth.jwks_url(),
            "https://witty-gecko-11.clerk.accounts.dev/.well-known/jwks.json"
        );
    }

    #[test]
    fn test_split_patterns() {
        let patterns = split_patterns("^/a, ^/b ,,^/c");
        assert_eq!(patterns, vec!["^/a", "^/b", "^/c"]);
    }

    #[test]
    fn test_default_path_policy() {
        let config = test_config();
        assert!(config
            .auth
            .protected_paths
            .iter()
            .any(|p| p.contains("/user/me")));
        assert!(!config.auth.exclude_paths.is_empty());
    }

    #[test]
    fn test_config_clone() {
        let config1 = test_config();
        let config2 = config1.clone();

        assert_eq!(config1.http_host, config2.http_host);
        assert_eq!(config1.database.url, config2.database.url);
        assert_eq!(config1.auth.issuer, config2.auth.issuer);
    }
}
