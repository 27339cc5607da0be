//! Bearer authentication middleware
//!
//! Orchestrates the per-request authentication chain for protected routes:
//! bearer extraction, token verification, provider profile fetch (with
//! claims fallback), identity reconciliation, and attachment of the
//! resolved identity to the request. Unprotected, excluded, and OPTIONS
//! requests bypass the chain entirely.

use crate::domain::User;
use crate::error::AppError;
use crate::idp::{ProviderClient, ProviderProfile};
use crate::jwt::{SessionClaims, TokenVerifier};
use crate::service::UserService;
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

/// Compiled route protection policy.
///
/// Patterns are regexes matched from the start of the path. Exclusion wins
/// over protection when both match.
pub struct PathPolicy {
    protected: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PathPolicy {
    pub fn new(protected: &[String], exclude: &[String]) -> anyhow::Result<Self> {
        Ok(Self {
            protected: compile(protected)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn is_protected(&self, path: &str) -> bool {
        if self.exclude.iter().any(|p| matches_start(p, path)) {
            return false;
        }
        self.protected.iter().any(|p| matches_start(p, path))
    }
}

fn compile(patterns: &[String]) -> anyhow::Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| anyhow::anyhow!("invalid path pattern '{}': {}", p, e)))
        .collect()
}

/// Match a pattern at the beginning of the path.
fn matches_start(pattern: &Regex, path: &str) -> bool {
    pattern.find(path).is_some_and(|m| m.start() == 0)
}

/// The verified external identity for the current request.
/// Constructed from token claims; not persisted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExternalIdentity {
    pub subject: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub session_id: Option<String>,
    pub issuer: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl ExternalIdentity {
    pub fn from_claims(claims: &SessionClaims) -> Self {
        Self {
            subject: claims.sub.clone(),
            email: claims.email.clone(),
            first_name: claims.first_name.clone(),
            last_name: claims.last_name.clone(),
            avatar_url: claims.image_url.clone(),
            session_id: claims.sid.clone(),
            issuer: claims.iss.clone(),
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }

    /// Token-embedded claims as a profile, used when the provider's user
    /// API cannot be reached.
    pub fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            subject: self.subject.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Identity context attached to protected requests.
///
/// `user` is `None` when identity resolution failed; the request is then
/// authenticated but unlinked, and handlers that need the local record
/// reject through the `CurrentUser` extractor.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub request_id: String,
    pub identity: ExternalIdentity,
    pub user: Option<User>,
}

/// Shared state for the authentication middleware
#[derive(Clone)]
pub struct AuthState {
    verifier: TokenVerifier,
    provider: ProviderClient,
    users: Arc<UserService>,
    policy: Arc<PathPolicy>,
}

impl AuthState {
    pub fn new(
        verifier: TokenVerifier,
        provider: ProviderClient,
        users: Arc<UserService>,
        policy: Arc<PathPolicy>,
    ) -> Self {
        Self {
            verifier,
            provider,
            users,
            policy,
        }
    }
}

/// Authentication middleware for protected routes.
///
/// Any verifier failure short-circuits with the mapped status (401 for
/// token faults, 503/502 for key-source faults) before the handler runs.
/// A reconciliation failure does not fail the request: authentication has
/// already succeeded, and a database hiccup should not lock out a working
/// token.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // CORS preflight never authenticates
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    if !auth.policy.is_protected(&path) {
        return next.run(request).await;
    }

    let start = Instant::now();
    let request_id = format!("req_{}", Uuid::new_v4().simple());

    let token = match bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(err) => return err.into_response(),
    };

    let claims = match auth.verifier.verify(&token).await {
        Ok(claims) => claims,
        Err(err) => {
            warn!(%request_id, %path, "token verification failed: {}", err);
            return AppError::from(err).into_response();
        }
    };

    let identity = ExternalIdentity::from_claims(&claims);

    // Prefer the provider's richer profile; degrade to token claims on any
    // lookup failure.
    let profile = match auth.provider.fetch_profile(&identity.subject).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!(
                %request_id,
                subject = %identity.subject,
                "profile fetch failed, using token claims: {}",
                err
            );
            identity.profile()
        }
    };

    let user = match auth.users.reconcile(&profile).await {
        Ok(user) => Some(user),
        Err(err) => {
            warn!(
                %request_id,
                subject = %identity.subject,
                "could not sync user with database, continuing unlinked: {}",
                err
            );
            None
        }
    };

    let auth_time = start.elapsed();
    request.extensions_mut().insert(RequestIdentity {
        request_id: request_id.clone(),
        identity,
        user,
    });

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if let Ok(value) = request_id.parse() {
        headers.insert("x-request-id", value);
    }
    if let Ok(value) = format!("{:.6}", auth_time.as_secs_f64()).parse() {
        headers.insert("x-auth-time", value);
    }
    if let Ok(value) = format!("{:.6}", start.elapsed().as_secs_f64()).parse() {
        headers.insert("x-process-time", value);
    }

    response
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid authorization header".into()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header encoding".into()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid authorization header".into()))
}

/// Extractor for handlers that need the reconciled local user
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .and_then(|ctx| ctx.user.clone())
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Extractor for handlers that only need the verified external identity
pub struct Identity(pub ExternalIdentity);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .map(|ctx| Identity(ctx.identity.clone()))
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy() -> PathPolicy {
        PathPolicy::new(
            &[
                "^/api/v1/user/me".to_string(),
                "^/api/v1/organization".to_string(),
            ],
            &["^/api/v1/user/[^/]+$".to_string()],
        )
        .unwrap()
    }

    #[rstest]
    #[case("/api/v1/user/me", true)]
    #[case("/api/v1/organization", true)]
    #[case("/api/v1/organization/users", true)]
    #[case("/health", false)]
    #[case("/api/v1/other", false)]
    fn test_path_protection_matrix(#[case] path: &str, #[case] protected: bool) {
        assert_eq!(policy().is_protected(path), protected);
    }

    #[test]
    fn test_exclusion_overrides_protection() {
        // "/api/v1/user/me" matches both the protected pattern and the
        // single-segment exclude pattern; exclusion wins.
        let policy = PathPolicy::new(
            &["^/api/v1/user/.*".to_string()],
            &["^/api/v1/user/me$".to_string()],
        )
        .unwrap();

        assert!(!policy.is_protected("/api/v1/user/me"));
        assert!(policy.is_protected("/api/v1/user/me/settings"));
    }

    #[test]
    fn test_direct_id_lookup_is_excluded() {
        let policy = policy();
        assert!(!policy.is_protected(
            "/api/v1/user/550e8400-e29b-41d4-a716-446655440000"
        ));
    }

    #[test]
    fn test_patterns_anchor_at_path_start() {
        let policy = PathPolicy::new(&["/api/v1/user/me".to_string()], &[]).unwrap();
        // Pattern text occurs mid-path only; python-style match() semantics
        // require it at the start
        assert!(!policy.is_protected("/proxy/api/v1/user/me"));
        assert!(policy.is_protected("/api/v1/user/me"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = PathPolicy::new(&["[unclosed".to_string()], &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            bearer_token(&headers),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert!(matches!(
            bearer_token(&headers),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_external_identity_from_claims() {
        let claims = SessionClaims {
            sub: "user_abc".to_string(),
            email: Some("ada@example.com".to_string()),
            first_name: Some("Ada".to_string()),
            last_name: None,
            image_url: None,
            sid: Some("sess_1".to_string()),
            iss: "https://issuer.test".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        };

        let identity = ExternalIdentity::from_claims(&claims);
        assert_eq!(identity.subject, "user_abc");
        assert_eq!(identity.session_id, Some("sess_1".to_string()));
        assert_eq!(identity.expires_at, 1_700_003_600);

        let profile = identity.profile();
        assert_eq!(profile.subject, "user_abc");
        assert_eq!(profile.email, Some("ada@example.com".to_string()));
        assert_eq!(profile.last_name, None);
    }

    #[tokio::test]
    async fn test_current_user_extractor_without_context() {
        let mut parts = axum::http::Request::builder()
            .uri("/api/v1/user/me")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = CurrentUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_current_user_extractor_with_unlinked_identity() {
        let claims = SessionClaims {
            sub: "user_abc".to_string(),
            email: None,
            first_name: None,
            last_name: None,
            image_url: None,
            sid: None,
            iss: String::new(),
            iat: 0,
            exp: 0,
        };

        let mut parts = axum::http::Request::builder()
            .uri("/api/v1/user/me")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        parts.extensions.insert(RequestIdentity {
            request_id: "req_test".to_string(),
            identity: ExternalIdentity::from_claims(&claims),
            user: None,
        });

        // Authenticated but unlinked: identity resolves, local user does not
        let result = CurrentUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        let result = Identity::from_request_parts(&mut parts, &()).await;
        assert_eq!(result.unwrap().0.subject, "user_abc");
    }
}
