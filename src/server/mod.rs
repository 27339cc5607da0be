//! Server initialization and routing

use crate::api;
use crate::config::Config;
use crate::idp::{KeyCache, ProviderClient};
use crate::jwt::TokenVerifier;
use crate::middleware::{auth_middleware, AuthState, PathPolicy, SanitizedMakeSpan};
use crate::repository::{OrganizationRepositoryImpl, UserRepositoryImpl};
use crate::service::{OrganizationService, UserService};
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub user_service: Arc<UserService>,
    pub organization_service: Arc<OrganizationService>,
    pub provider: ProviderClient,
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    // Create database connection pool
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    crate::migration::run_migrations(&db_pool).await?;

    // Repositories and services
    let user_repo = Arc::new(UserRepositoryImpl::new(db_pool.clone()));
    let organization_repo = Arc::new(OrganizationRepositoryImpl::new(db_pool.clone()));

    let user_service = Arc::new(UserService::new(user_repo.clone()));
    let organization_service = Arc::new(OrganizationService::new(organization_repo, user_repo));

    // Identity provider plumbing
    let key_cache = KeyCache::new(
        config.auth.jwks_url(),
        Duration::from_secs(config.auth.provider_timeout_secs),
    );
    let verifier = TokenVerifier::new(
        key_cache,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
    );
    let provider = ProviderClient::new(&config.auth);
    let policy = Arc::new(PathPolicy::new(
        &config.auth.protected_paths,
        &config.auth.exclude_paths,
    )?);

    let auth_state = AuthState::new(
        verifier,
        provider.clone(),
        user_service.clone(),
        policy,
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        db_pool,
        user_service,
        organization_service,
        provider,
    };

    let app = build_router(state, auth_state);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router
pub fn build_router(state: AppState, auth_state: AuthState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready))
        // Auth endpoints
        .route("/api/v1/auth/me", get(api::auth::me))
        .route("/api/v1/auth/session", get(api::auth::session))
        // User endpoints
        .route(
            "/api/v1/user/me",
            get(api::user::me)
                .post(api::user::sync_me)
                .delete(api::user::delete_me),
        )
        .route("/api/v1/user/{id}", get(api::user::get))
        // Organization endpoints
        .route("/api/v1/organization", post(api::organization::create))
        .route(
            "/api/v1/organization/me",
            get(api::organization::me)
                .put(api::organization::update_me)
                .delete(api::organization::delete_me),
        )
        .route(
            "/api/v1/organization/users",
            get(api::organization::members),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(cors)
        .with_state(state)
}
