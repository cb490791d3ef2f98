//! Session credential management routes.
//!
//! New credentials are verified with a live probe request before they enter
//! the rotation. Secrets are never echoed back in full.

use axum::{Json, Router, extract::State, routing::get};
use tracing::{info, warn};

use crate::api::error::ApiResult;
use crate::api::models::{AddCredentialRequest, CredentialListResponse, FlashResponse};
use crate::api::server::AppState;

/// Create the credentials router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_credentials).post(add_credential))
}

#[utoipa::path(
    get,
    path = "/api/cookies",
    tag = "credentials",
    responses(
        (status = 200, description = "Stored credentials with the active index", body = CredentialListResponse)
    )
)]
pub async fn list_credentials(
    State(state): State<AppState>,
) -> ApiResult<Json<CredentialListResponse>> {
    let entries = state.credential_store.snapshot();
    Ok(Json(CredentialListResponse {
        count: entries.len(),
        current_index: state.credential_store.current_index(),
        cookies: entries.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/cookies",
    tag = "credentials",
    request_body = AddCredentialRequest,
    responses(
        (status = 200, description = "Outcome of verification and insertion", body = FlashResponse)
    )
)]
pub async fn add_credential(
    State(state): State<AppState>,
    Json(request): Json<AddCredentialRequest>,
) -> ApiResult<Json<FlashResponse>> {
    let cookie = request.cookie.trim();
    let name = request.name.trim();

    if cookie.is_empty() {
        return Ok(Json(FlashResponse::error("no cookie provided")));
    }

    let outcome = match state.instagram.verify_credential(cookie).await {
        Ok(true) => {
            if state.credential_store.add(name, cookie) {
                info!(name, "credential verified and added");
                FlashResponse::success(format!("Cookie '{name}' added successfully and verified"))
            } else {
                FlashResponse::warning("Cookie already exists")
            }
        }
        Ok(false) => {
            warn!(name, "credential failed probe verification");
            FlashResponse::error("Cookie verification failed")
        }
        Err(e) => {
            warn!(name, error = %e, "credential probe errored");
            FlashResponse::error(format!("Cookie verification failed: {e}"))
        }
    };

    Ok(Json(outcome))
}
