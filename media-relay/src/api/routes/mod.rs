//! API route modules.
//!
//! Organizes routes by resource type.

pub mod credentials;
pub mod health;
pub mod profile;
pub mod video;

use axum::{Router, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::middleware::rate_limit::rate_limit;
use crate::api::openapi::ApiDoc;
use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/instagram", profile::router())
        .nest("/api/cookies", credentials::router())
        .nest("/api/tkdl", video::router())
        .merge(health::router())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
