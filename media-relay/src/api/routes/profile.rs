//! Profile scrape routes.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use tracing::info;

use upstream_client::ClientError;
use upstream_client::diagnostics::DiagnosticsReport;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{DebugDto, InstagramResponse};
use crate::api::server::AppState;

/// Create the profile router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{username}", get(get_profile))
}

#[utoipa::path(
    get,
    path = "/api/instagram/{username}",
    tag = "instagram",
    params(
        ("username" = String, Path, description = "Profile username to scrape")
    ),
    responses(
        (status = 200, description = "Profile with stories and posts", body = InstagramResponse),
        (status = 400, description = "Blank username"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Upstream lookup failed after all retries")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<InstagramResponse>> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::bad_request("missing username"));
    }

    let mut diagnostics = DiagnosticsReport::new();
    let started = Instant::now();

    let result = state.instagram.fetch_profile(&username, &mut diagnostics).await;
    diagnostics.record_elapsed(started);

    match result {
        Ok(report) => {
            info!(
                username,
                posts = report.posts.count,
                stories = report.stories.count,
                elapsed = diagnostics.stats.processing_time,
                "profile scrape complete"
            );
            Ok(Json(InstagramResponse::from_report(report, diagnostics)))
        }
        Err(ClientError::UserNotFound) => {
            diagnostics.error("user not found in upstream response");
            Err(ApiError::not_found("user not found").with_details(debug_details(diagnostics)))
        }
        Err(ClientError::Exhausted(failure)) => {
            diagnostics.error(format!("failed to fetch profile: {failure}"));
            Err(ApiError::internal(failure.to_string()).with_details(debug_details(diagnostics)))
        }
        Err(e) => {
            diagnostics.error(format!("fatal error: {e}"));
            Err(ApiError::internal(e.to_string()).with_details(debug_details(diagnostics)))
        }
    }
}

fn debug_details(diagnostics: DiagnosticsReport) -> serde_json::Value {
    serde_json::to_value(DebugDto::from(diagnostics)).unwrap_or_default()
}
