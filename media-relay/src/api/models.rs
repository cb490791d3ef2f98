//! API request and response models (DTOs).
//!
//! These models handle serialization between the API layer and the upstream
//! client's domain types, and carry the OpenAPI schema annotations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use upstream_client::credentials::CredentialEntry;
use upstream_client::diagnostics::{DiagnosticsReport, DiagnosticsStats};
use upstream_client::instagram::media::{MediaItem, MediaKind, PostRecord};
use upstream_client::instagram::{Batch, ProfileData, ProfileReport};

// ============================================================================
// Liveness
// ============================================================================

/// Liveness probe response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UptimeResponse {
    /// Always "online" if the process is responding
    pub status: String,
    /// Timestamp of this probe
    pub last_check: DateTime<Utc>,
    /// Monotonically increasing probe counter
    pub requests_served: u64,
    /// Current server time
    pub server_time: DateTime<Utc>,
}

// ============================================================================
// Profile scrape
// ============================================================================

/// Normalized profile fields.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileDto {
    pub username: String,
    pub full_name: String,
    pub profile_pic: Option<String>,
    pub bio: String,
    pub followers: u64,
    pub following: u64,
    pub posts_count: u64,
    pub is_private: bool,
}

impl From<ProfileData> for ProfileDto {
    fn from(p: ProfileData) -> Self {
        Self {
            username: p.username,
            full_name: p.full_name,
            profile_pic: p.profile_pic,
            bio: p.bio,
            followers: p.followers,
            following: p.following,
            posts_count: p.posts_count,
            is_private: p.is_private,
        }
    }
}

/// One resolved media entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MediaItemDto {
    /// "image" or "video"
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carousel_index: Option<usize>,
}

impl From<MediaItem> for MediaItemDto {
    fn from(m: MediaItem) -> Self {
        Self {
            media_type: match m.media_type {
                MediaKind::Image => "image".to_string(),
                MediaKind::Video => "video".to_string(),
            },
            url: m.url,
            cover_url: m.cover_url,
            carousel_index: m.carousel_index,
        }
    }
}

/// A normalized post with its media entries.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostDto {
    pub id: String,
    pub caption: String,
    pub timestamp: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_video: bool,
    pub is_carousel: bool,
    pub media: Vec<MediaItemDto>,
}

impl From<PostRecord> for PostDto {
    fn from(p: PostRecord) -> Self {
        Self {
            id: p.id,
            caption: p.caption,
            timestamp: p.timestamp,
            like_count: p.like_count,
            comment_count: p.comment_count,
            is_video: p.is_video,
            is_carousel: p.is_carousel,
            media: p.media.into_iter().map(Into::into).collect(),
        }
    }
}

/// A counted list of stories.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoryListDto {
    pub count: usize,
    pub items: Vec<MediaItemDto>,
}

impl From<Batch<MediaItem>> for StoryListDto {
    fn from(b: Batch<MediaItem>) -> Self {
        Self {
            count: b.count,
            items: b.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// A counted list of posts.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PostListDto {
    pub count: usize,
    pub items: Vec<PostDto>,
}

impl From<Batch<PostRecord>> for PostListDto {
    fn from(b: Batch<PostRecord>) -> Self {
        Self {
            count: b.count,
            items: b.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-request scrape diagnostics.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DebugDto {
    pub request_time: DateTime<Utc>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: DebugStatsDto,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DebugStatsDto {
    pub posts_processed: u64,
    pub posts_failed: u64,
    pub stories_processed: u64,
    pub stories_failed: u64,
    pub api_calls: u64,
    pub processing_time: f64,
}

impl From<DiagnosticsStats> for DebugStatsDto {
    fn from(s: DiagnosticsStats) -> Self {
        Self {
            posts_processed: s.posts_processed,
            posts_failed: s.posts_failed,
            stories_processed: s.stories_processed,
            stories_failed: s.stories_failed,
            api_calls: s.api_calls,
            processing_time: s.processing_time,
        }
    }
}

impl From<DiagnosticsReport> for DebugDto {
    fn from(d: DiagnosticsReport) -> Self {
        Self {
            request_time: d.request_time,
            errors: d.errors,
            warnings: d.warnings,
            stats: d.stats.into(),
        }
    }
}

/// Full response for one profile lookup.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InstagramResponse {
    pub profile: ProfileDto,
    pub stories: StoryListDto,
    pub posts: PostListDto,
    pub debug: DebugDto,
}

impl InstagramResponse {
    pub fn from_report(report: ProfileReport, diagnostics: DiagnosticsReport) -> Self {
        Self {
            profile: report.profile.into(),
            stories: report.stories.into(),
            posts: report.posts.into(),
            debug: diagnostics.into(),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Display-safe view of one stored credential.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CredentialDto {
    pub index: usize,
    pub name: String,
    /// Secret truncated for display
    pub cookie: String,
    pub is_active: bool,
}

impl From<CredentialEntry> for CredentialDto {
    fn from(e: CredentialEntry) -> Self {
        Self {
            index: e.index,
            name: e.name,
            cookie: e.secret_preview,
            is_active: e.is_active,
        }
    }
}

/// Credential listing response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CredentialListResponse {
    pub count: usize,
    pub current_index: usize,
    pub cookies: Vec<CredentialDto>,
}

/// Request to add a new session credential.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddCredentialRequest {
    /// Display name; auto-generated when empty
    #[serde(default)]
    pub name: String,
    /// Full cookie header value
    pub cookie: String,
}

/// Flash-style operation outcome.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlashResponse {
    /// "success", "warning", or "error"
    pub status: String,
    pub message: String,
}

impl FlashResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: "warning".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Video download
// ============================================================================

/// Error envelope for failed video downloads.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VideoErrorResponse {
    pub error: String,
    /// Always "failed"
    pub status: String,
}

impl VideoErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: "failed".to_string(),
        }
    }
}
