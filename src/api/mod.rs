//! API layer - HTTP handlers and routing
//!
//! Thin axum adapter over the use cases:
//! - User endpoints (register, login, email check, avatar, current user)
//! - Campaign endpoints (list, detail, create, update, image upload)
//! - Static serving of stored images under `/images`

pub mod campaigns;
pub mod middleware;
pub mod upload;
pub mod users;
pub mod validation;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::ServerConfig;

pub use middleware::{AppState, AuthenticatedUser};
pub use validation::{Validate, ValidJson};

/// Room for multipart boundaries, part headers and text fields on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(users::protected_router())
        .merge(campaigns::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .merge(users::public_router())
        .merge(campaigns::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware.
///
/// Fails when the configured CORS origin is not a valid header value.
pub fn build_router(state: AppState, server: &ServerConfig) -> anyhow::Result<Router> {
    let origin = server
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", server.cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    let images = ServeDir::new(&state.upload_config.path);
    let body_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service(upload::IMAGES_ROUTE, images)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}
