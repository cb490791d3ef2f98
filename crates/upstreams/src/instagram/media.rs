//! Normalization of raw feed items into media records.
//!
//! The upstream feed payloads are schema-unstable, so every field access is
//! defensive: a malformed item is isolated and reported, never allowed to
//! abort the batch.

use serde::Serialize;
use serde_json::Value;

use crate::diagnostics::DiagnosticsReport;

/// Upstream media type discriminants.
const MEDIA_TYPE_IMAGE: u64 = 1;
const MEDIA_TYPE_VIDEO: u64 = 2;
const MEDIA_TYPE_CAROUSEL: u64 = 8;

/// One resolved media entry within a post or story.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub media_type: MediaKind,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carousel_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// A normalized post with its resolved media entries.
#[derive(Debug, Clone, Serialize)]
pub struct PostRecord {
    pub id: String,
    pub caption: String,
    pub timestamp: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_video: bool,
    pub is_carousel: bool,
    pub media: Vec<MediaItem>,
}

fn first_candidate_url(media: &Value) -> Option<String> {
    media
        .get("image_versions2")?
        .get("candidates")?
        .as_array()?
        .first()?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

fn first_video_url(media: &Value) -> Option<String> {
    media
        .get("video_versions")?
        .as_array()?
        .first()?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

/// Normalize a single image or video item. Returns `None` when no usable
/// media URL can be resolved.
pub fn normalize_media_item(
    media: &Value,
    media_type: u64,
    carousel_index: Option<usize>,
) -> Option<MediaItem> {
    match media_type {
        MEDIA_TYPE_IMAGE => first_candidate_url(media).map(|url| MediaItem {
            media_type: MediaKind::Image,
            url,
            cover_url: None,
            carousel_index,
        }),
        MEDIA_TYPE_VIDEO => first_video_url(media).map(|url| MediaItem {
            media_type: MediaKind::Video,
            url,
            cover_url: first_candidate_url(media),
            carousel_index,
        }),
        _ => None,
    }
}

/// Normalize the sub-items of a carousel, tagging each with its position in
/// source order. Unresolvable sub-items are skipped.
pub fn normalize_carousel(carousel_media: &Value, diagnostics: &mut DiagnosticsReport) -> Vec<MediaItem> {
    let Some(items) = carousel_media.as_array() else {
        return Vec::new();
    };

    let mut media = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let Some(media_type) = item.get("media_type").and_then(Value::as_u64) else {
            diagnostics.error(format!("carousel item {index} has no media_type"));
            continue;
        };
        if let Some(entry) = normalize_media_item(item, media_type, Some(index)) {
            media.push(entry);
        }
    }
    media
}

/// Build a [`PostRecord`] from one raw feed item. The record's media list
/// may be empty; the caller decides whether that is a warning.
pub fn normalize_post(post: &Value, diagnostics: &mut DiagnosticsReport) -> PostRecord {
    let caption = post
        .get("caption")
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let media_type = post.get("media_type").and_then(Value::as_u64).unwrap_or(0);

    let mut record = PostRecord {
        id: post
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        caption,
        timestamp: post.get("taken_at").and_then(Value::as_u64).unwrap_or(0),
        like_count: post.get("like_count").and_then(Value::as_u64).unwrap_or(0),
        comment_count: post
            .get("comment_count")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        is_video: media_type == MEDIA_TYPE_VIDEO,
        is_carousel: media_type == MEDIA_TYPE_CAROUSEL,
        media: Vec::new(),
    };

    match media_type {
        MEDIA_TYPE_IMAGE | MEDIA_TYPE_VIDEO => {
            if let Some(entry) = normalize_media_item(post, media_type, None) {
                record.media.push(entry);
            }
        }
        MEDIA_TYPE_CAROUSEL => {
            if let Some(carousel) = post.get("carousel_media") {
                record.media = normalize_carousel(carousel, diagnostics);
            }
        }
        _ => {}
    }

    record
}
