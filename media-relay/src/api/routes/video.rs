//! Video re-download routes.

use std::path::PathBuf;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::api::models::VideoErrorResponse;
use crate::api::server::AppState;

/// Create the video download router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{*url}", get(download_video))
}

#[utoipa::path(
    get,
    path = "/api/tkdl/{url}",
    tag = "video",
    params(
        ("url" = String, Path, description = "Video URL in any supported form")
    ),
    responses(
        (status = 200, description = "Watermark-free video bytes", content_type = "video/mp4"),
        (status = 500, description = "Resolution or download failed", body = VideoErrorResponse)
    )
)]
pub async fn download_video(State(state): State<AppState>, Path(url): Path<String>) -> Response {
    let dest_dir = PathBuf::from(&state.config.download_dir);

    match state.tiktok.download(&url, &dest_dir).await {
        Ok(path) => match serve_file(&path).await {
            Ok(response) => response,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read downloaded video");
                failure(e.to_string())
            }
        },
        Err(e) => {
            error!(url, error = %e, "video download failed");
            failure(e.to_string())
        }
    }
}

async fn serve_file(path: &std::path::Path) -> std::io::Result<Response> {
    let file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("video.mp4")
        .to_string();

    info!(filename, bytes = length, "serving downloaded video");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

fn failure(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(VideoErrorResponse::new(message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn serve_file_streams_body_with_attachment_headers() {
        let path = std::env::temp_dir().join(format!("tiktok_{}.mp4", std::process::id()));
        let payload = vec![7u8; 256 * 1024];
        tokio::fs::write(&path, &payload).await.unwrap();

        let response = serve_file(&path).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            response.headers()[header::CONTENT_LENGTH],
            payload.len().to_string().as_str()
        );
        assert!(
            response.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .starts_with("attachment; filename=\"tiktok_")
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.len(), payload.len());
        assert_eq!(&bytes[..], &payload[..]);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn serve_file_propagates_missing_file() {
        let path = std::env::temp_dir().join("media-relay-absent.mp4");
        assert!(serve_file(&path).await.is_err());
    }
}
