//! OpenAPI documentation configuration.
//!
//! Configures OpenAPI 3.0 specification generation using `utoipa` and serves
//! Swagger UI for interactive API exploration.

use utoipa::OpenApi;

use crate::api::models::{
    AddCredentialRequest, CredentialDto, CredentialListResponse, DebugDto, DebugStatsDto,
    FlashResponse, InstagramResponse, MediaItemDto, PostDto, PostListDto, ProfileDto,
    StoryListDto, UptimeResponse, VideoErrorResponse,
};

/// OpenAPI documentation for the media-relay API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-relay API",
        version = "0.1.0",
        description = "REST API relaying social media profile metadata and video re-downloads through rotated upstream sessions.",
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    tags(
        (name = "health", description = "Liveness endpoints for uptime monitors"),
        (name = "instagram", description = "Profile, story, and feed scraping endpoints"),
        (name = "credentials", description = "Session credential management endpoints"),
        (name = "video", description = "Video re-download endpoints")
    ),
    paths(
        crate::api::routes::health::uptime_check,
        crate::api::routes::profile::get_profile,
        crate::api::routes::credentials::list_credentials,
        crate::api::routes::credentials::add_credential,
        crate::api::routes::video::download_video,
    ),
    components(schemas(
        UptimeResponse,
        InstagramResponse,
        ProfileDto,
        MediaItemDto,
        PostDto,
        PostListDto,
        StoryListDto,
        DebugDto,
        DebugStatsDto,
        CredentialDto,
        CredentialListResponse,
        AddCredentialRequest,
        FlashResponse,
        VideoErrorResponse,
    ))
)]
pub struct ApiDoc;
