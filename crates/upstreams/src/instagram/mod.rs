//! Instagram profile, story, and feed client.
//!
//! All calls go through [`SessionRequester`], so credential rotation, retry,
//! and soft-failure handling apply uniformly. The feed listing walks the
//! upstream cursor-based pagination protocol and accumulates normalized
//! records plus per-item diagnostics.

pub mod media;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::DEFAULT_UA;
use crate::diagnostics::DiagnosticsReport;
use crate::error::ClientError;
use crate::requester::{SessionRequester, Transport};

use media::{MediaItem, PostRecord, normalize_media_item, normalize_post};

const WEB_BASE: &str = "https://www.instagram.com";
const MEDIA_BASE: &str = "https://i.instagram.com";

/// App identifier the web client sends with every API call.
const IG_APP_ID: &str = "936619743392459";

/// Page size requested from the feed endpoint.
const FEED_PAGE_SIZE: u32 = 50;

/// Limits applied to the feed pagination loop.
#[derive(Debug, Clone)]
pub struct FeedLimits {
    /// Stop once this many posts have been accumulated.
    pub max_posts: usize,
    /// Pause between successive pages, to stay under upstream abuse radar.
    pub page_pause: Duration,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            max_posts: 100,
            page_pause: Duration::from_secs(1),
        }
    }
}

/// Normalized profile fields.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileData {
    pub username: String,
    pub full_name: String,
    pub profile_pic: Option<String>,
    pub bio: String,
    pub followers: u64,
    pub following: u64,
    pub posts_count: u64,
    pub is_private: bool,
}

/// A counted batch of items, the shape every listing in the API response
/// uses.
#[derive(Debug, Clone, Serialize)]
pub struct Batch<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> Batch<T> {
    fn new(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }

    fn empty() -> Self {
        Self {
            count: 0,
            items: Vec::new(),
        }
    }
}

/// Full scrape result for one profile lookup.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub profile: ProfileData,
    pub stories: Batch<MediaItem>,
    pub posts: Batch<PostRecord>,
}

/// Browser-equivalent header set presented to the upstream API.
pub fn default_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let ua = HeaderValue::from_str(user_agent)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_UA));
    headers.insert(reqwest::header::USER_AGENT, ua);
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(
        reqwest::header::REFERER,
        HeaderValue::from_static("https://www.instagram.com/"),
    );
    headers.insert("DNT", HeaderValue::from_static("1"));
    headers.insert(
        reqwest::header::CONNECTION,
        HeaderValue::from_static("keep-alive"),
    );
    headers.insert(
        "Upgrade-Insecure-Requests",
        HeaderValue::from_static("1"),
    );
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers.insert("X-IG-App-ID", HeaderValue::from_static(IG_APP_ID));
    headers.insert(
        "X-Requested-With",
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers
}

/// URL used to verify a candidate credential with a lightweight probe.
pub fn probe_url() -> String {
    format!("{WEB_BASE}/api/v1/users/web_profile_info/?username=instagram")
}

/// Client for the profile/story/feed endpoints.
pub struct InstagramClient {
    requester: SessionRequester,
    transport: Arc<dyn Transport>,
    limits: FeedLimits,
    user_agent: String,
}

impl InstagramClient {
    pub fn new(
        requester: SessionRequester,
        transport: Arc<dyn Transport>,
        limits: FeedLimits,
        user_agent: String,
    ) -> Self {
        Self {
            requester,
            transport,
            limits,
            user_agent,
        }
    }

    /// Fetch profile, stories, and posts for one username.
    ///
    /// Soft failures past the profile lookup degrade to partial results in
    /// the diagnostics; only the initial lookup is fatal.
    pub async fn fetch_profile(
        &self,
        username: &str,
        diagnostics: &mut DiagnosticsReport,
    ) -> Result<ProfileReport, ClientError> {
        let url = format!(
            "{WEB_BASE}/api/v1/users/web_profile_info/?username={}",
            urlencoding::encode(username)
        );

        diagnostics.stats.api_calls += 1;
        let response = self
            .requester
            .request(Method::GET, &url)
            .await
            .map_err(ClientError::Exhausted)?;

        let payload: Value = response.json()?;
        let user = payload
            .get("data")
            .and_then(|d| d.get("user"))
            .filter(|u| !u.is_null())
            .cloned()
            .ok_or(ClientError::UserNotFound)?;

        let profile = Self::normalize_profile(&user);

        let followed_by_viewer = user
            .get("followed_by_viewer")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if profile.is_private && !followed_by_viewer {
            diagnostics.warning("private account - limited data available");
            info!(username, "target profile is private; returning profile only");
            return Ok(ProfileReport {
                profile,
                stories: Batch::empty(),
                posts: Batch::empty(),
            });
        }

        let user_id = user
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Other("could not fetch user id".to_string()))?;

        let stories = self.fetch_stories(&user_id, diagnostics).await;
        let posts = self.fetch_user_posts(&user_id, diagnostics).await;

        Ok(ProfileReport {
            profile,
            stories,
            posts,
        })
    }

    fn normalize_profile(user: &Value) -> ProfileData {
        let str_field = |key: &str| {
            user.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let edge_count = |key: &str| {
            user.get(key)
                .and_then(|e| e.get("count"))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };

        let profile_pic = user
            .get("profile_pic_url_hd")
            .and_then(Value::as_str)
            .or_else(|| user.get("profile_pic_url").and_then(Value::as_str))
            .map(str::to_string);

        ProfileData {
            username: str_field("username"),
            full_name: str_field("full_name"),
            profile_pic,
            bio: str_field("biography"),
            followers: edge_count("edge_followed_by"),
            following: edge_count("edge_follow"),
            posts_count: edge_count("edge_owner_to_timeline_media"),
            is_private: user
                .get("is_private")
                .and_then(Value::as_bool)
                .unwrap_or(true),
        }
    }

    /// Fetch the bounded story list. Failures degrade to an empty batch.
    pub async fn fetch_stories(
        &self,
        user_id: &str,
        diagnostics: &mut DiagnosticsReport,
    ) -> Batch<MediaItem> {
        let url = format!("{MEDIA_BASE}/api/v1/feed/user/{user_id}/reel_media/");

        diagnostics.stats.api_calls += 1;
        let response = match self.requester.request(Method::GET, &url).await {
            Ok(response) => response,
            Err(failure) => {
                diagnostics.error(format!("failed to fetch stories: {failure}"));
                return Batch::empty();
            }
        };

        let items = response
            .json()
            .ok()
            .and_then(|v: Value| v.get("items").cloned())
            .and_then(|items| items.as_array().cloned())
            .unwrap_or_default();

        let mut stories = Vec::new();
        for story in &items {
            diagnostics.stats.stories_processed += 1;
            let Some(media_type) = story.get("media_type").and_then(Value::as_u64) else {
                diagnostics.stats.stories_failed += 1;
                diagnostics.error("story item has no media_type");
                continue;
            };
            match normalize_media_item(story, media_type, None) {
                Some(item) => stories.push(item),
                None => {
                    diagnostics.stats.stories_failed += 1;
                    diagnostics.error("failed to resolve story media url");
                }
            }
        }

        Batch::new(stories)
    }

    /// Walk the cursor-based feed pagination until exhaustion, cap, or
    /// failure. A mid-loop failure terminates with partial results.
    pub async fn fetch_user_posts(
        &self,
        user_id: &str,
        diagnostics: &mut DiagnosticsReport,
    ) -> Batch<PostRecord> {
        let base_url = format!("{WEB_BASE}/api/v1/feed/user/{user_id}/?count={FEED_PAGE_SIZE}");
        let mut posts: Vec<PostRecord> = Vec::new();
        let mut more_available = true;
        let mut max_id: Option<String> = None;

        while more_available && posts.len() < self.limits.max_posts {
            let url = match &max_id {
                Some(cursor) => format!("{base_url}&max_id={}", urlencoding::encode(cursor)),
                None => base_url.clone(),
            };

            diagnostics.stats.api_calls += 1;
            let response = match self.requester.request(Method::GET, &url).await {
                Ok(response) => response,
                Err(failure) => {
                    diagnostics.error(format!("failed to fetch posts: {failure}"));
                    break;
                }
            };

            let page: Value = match response.json() {
                Ok(page) => page,
                Err(e) => {
                    diagnostics.error(format!("failed to parse posts page: {e}"));
                    break;
                }
            };

            let Some(items) = page.get("items").and_then(Value::as_array) else {
                break;
            };
            if items.is_empty() {
                break;
            }

            for item in items {
                if posts.len() >= self.limits.max_posts {
                    break;
                }
                diagnostics.stats.posts_processed += 1;

                if !item.is_object() {
                    diagnostics.stats.posts_failed += 1;
                    diagnostics.error("feed item is not an object");
                    continue;
                }

                let record = normalize_post(item, diagnostics);
                if record.media.is_empty() {
                    let id = if record.id.is_empty() {
                        "unknown"
                    } else {
                        record.id.as_str()
                    };
                    diagnostics.warning(format!("post {id} has no valid media"));
                    continue;
                }
                posts.push(record);
            }

            more_available = page
                .get("more_available")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            max_id = page
                .get("next_max_id")
                .and_then(Value::as_str)
                .map(str::to_string);
            if max_id.is_none() {
                more_available = false;
            }

            if more_available && posts.len() < self.limits.max_posts {
                debug!(collected = posts.len(), "pausing before next feed page");
                if self.limits.page_pause > Duration::ZERO {
                    tokio::time::sleep(self.limits.page_pause).await;
                }
            }
        }

        Batch::new(posts)
    }

    /// Verify a candidate credential with a lightweight probe request,
    /// bypassing the rotation store so the candidate itself is presented.
    pub async fn verify_credential(&self, secret: &str) -> Result<bool, ClientError> {
        let mut headers = HeaderMap::new();
        let ua = HeaderValue::from_str(&self.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_UA));
        headers.insert(reqwest::header::USER_AGENT, ua);
        match HeaderValue::from_str(secret) {
            Ok(value) => {
                headers.insert(reqwest::header::COOKIE, value);
            }
            Err(_) => return Ok(false),
        }

        let outcome = self
            .transport
            .send(Method::GET, &probe_url(), headers)
            .await;
        match outcome {
            Ok(response) => Ok(response.status.is_success()),
            Err(reason) => {
                warn!(reason, "credential probe failed");
                Err(ClientError::Other(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credential, CredentialStore};
    use crate::requester::testing::ScriptedTransport;
    use crate::requester::{RawResponse, RequestPolicy, RetryLimit};
    use serde_json::json;

    fn limits(max_posts: usize) -> FeedLimits {
        FeedLimits {
            max_posts,
            page_pause: Duration::ZERO,
        }
    }

    fn client_with(
        transport: Arc<ScriptedTransport>,
        max_posts: usize,
    ) -> InstagramClient {
        let store = Arc::new(CredentialStore::new(vec![Credential {
            name: "c0".into(),
            secret: "secret-0".into(),
        }]));
        let requester = SessionRequester::new(
            transport.clone(),
            store,
            RequestPolicy::immediate(RetryLimit::PerCredential),
            default_headers(DEFAULT_UA),
        );
        InstagramClient::new(requester, transport, limits(max_posts), DEFAULT_UA.to_string())
    }

    fn feed_page(count: usize, start: usize, more: bool, next: Option<&str>) -> String {
        let items: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "id": format!("post-{}", start + i),
                    "media_type": 1,
                    "taken_at": 1_700_000_000u64 + (start + i) as u64,
                    "image_versions2": {"candidates": [{"url": format!("https://cdn/{}.jpg", start + i)}]}
                })
            })
            .collect();
        json!({
            "items": items,
            "more_available": more,
            "next_max_id": next,
        })
        .to_string()
    }

    #[tokio::test]
    async fn pagination_walks_all_pages() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::ok(200, &feed_page(20, 0, true, Some("c1"))),
            ScriptedTransport::ok(200, &feed_page(20, 20, true, Some("c2"))),
            ScriptedTransport::ok(200, &feed_page(20, 40, false, None)),
        ]));
        let client = client_with(transport, 100);
        let mut diagnostics = DiagnosticsReport::new();

        let posts = client.fetch_user_posts("42", &mut diagnostics).await;
        assert_eq!(posts.count, 60);
        assert_eq!(diagnostics.stats.api_calls, 3);
        assert_eq!(diagnostics.stats.posts_processed, 60);
        assert!(diagnostics.errors.is_empty());
    }

    #[tokio::test]
    async fn pagination_stops_at_cap() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            200,
            &feed_page(20, 0, true, Some("c1")),
        )]));
        let client = client_with(transport.clone(), 10);
        let mut diagnostics = DiagnosticsReport::new();

        let posts = client.fetch_user_posts("42", &mut diagnostics).await;
        assert_eq!(posts.count, 10);
        assert_eq!(diagnostics.stats.api_calls, 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn mid_loop_failure_returns_partial_results() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ScriptedTransport::ok(200, &feed_page(20, 0, true, Some("c1"))),
            ScriptedTransport::ok(429, "slow down"),
        ]));
        let client = client_with(transport, 100);
        let mut diagnostics = DiagnosticsReport::new();

        let posts = client.fetch_user_posts("42", &mut diagnostics).await;
        assert_eq!(posts.count, 20);
        assert_eq!(diagnostics.stats.api_calls, 2);
        assert_eq!(diagnostics.errors.len(), 1);
        assert!(diagnostics.errors[0].contains("rate_limited"));
    }

    #[tokio::test]
    async fn post_without_usable_media_is_warned_and_excluded() {
        let page = json!({
            "items": [
                {"id": "bare", "media_type": 2},
                {
                    "id": "good",
                    "media_type": 1,
                    "image_versions2": {"candidates": [{"url": "https://cdn/x.jpg"}]}
                }
            ],
            "more_available": false,
            "next_max_id": null,
        })
        .to_string();
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            200, &page,
        )]));
        let client = client_with(transport, 100);
        let mut diagnostics = DiagnosticsReport::new();

        let posts = client.fetch_user_posts("42", &mut diagnostics).await;
        assert_eq!(posts.count, 1);
        assert_eq!(posts.items[0].id, "good");
        assert_eq!(diagnostics.stats.posts_processed, 2);
        assert_eq!(diagnostics.warnings.len(), 1);
        assert!(diagnostics.warnings[0].contains("bare"));
    }

    #[tokio::test]
    async fn private_profile_short_circuits() {
        let body = json!({
            "data": {"user": {
                "id": "99",
                "username": "hidden",
                "full_name": "Hidden User",
                "is_private": true,
                "followed_by_viewer": false,
                "edge_followed_by": {"count": 10},
                "edge_follow": {"count": 5},
                "edge_owner_to_timeline_media": {"count": 3}
            }}
        })
        .to_string();
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            200, &body,
        )]));
        let client = client_with(transport.clone(), 100);
        let mut diagnostics = DiagnosticsReport::new();

        let report = client.fetch_profile("hidden", &mut diagnostics).await.unwrap();
        assert!(report.profile.is_private);
        assert_eq!(report.stories.count, 0);
        assert_eq!(report.posts.count, 0);
        assert_eq!(diagnostics.warnings.len(), 1);
        // Only the profile lookup went out.
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn missing_user_maps_to_not_found() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            200,
            r#"{"data": {"user": null}}"#,
        )]));
        let client = client_with(transport, 100);
        let mut diagnostics = DiagnosticsReport::new();

        let err = client
            .fetch_profile("ghost", &mut diagnostics)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UserNotFound));
    }

    #[tokio::test]
    async fn stories_failure_degrades_to_empty_batch() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            403, "{}",
        )]));
        let client = client_with(transport, 100);
        let mut diagnostics = DiagnosticsReport::new();

        let stories = client.fetch_stories("42", &mut diagnostics).await;
        assert_eq!(stories.count, 0);
        assert_eq!(diagnostics.errors.len(), 1);
        assert!(diagnostics.errors[0].contains("forbidden"));
    }

    #[tokio::test]
    async fn stories_normalize_images_and_videos() {
        let body = json!({
            "items": [
                {"media_type": 1, "image_versions2": {"candidates": [{"url": "https://cdn/s1.jpg"}]}},
                {"media_type": 2, "video_versions": [{"url": "https://cdn/s2.mp4"}]},
                {"media_type": 2}
            ]
        })
        .to_string();
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            200, &body,
        )]));
        let client = client_with(transport, 100);
        let mut diagnostics = DiagnosticsReport::new();

        let stories = client.fetch_stories("42", &mut diagnostics).await;
        assert_eq!(stories.count, 2);
        assert_eq!(diagnostics.stats.stories_processed, 3);
        assert_eq!(diagnostics.stats.stories_failed, 1);
    }

    #[tokio::test]
    async fn verify_credential_accepts_200_probe() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            200, "{}",
        )]));
        let client = client_with(transport, 100);
        assert!(client.verify_credential("sessionid=abc").await.unwrap());
    }

    #[tokio::test]
    async fn verify_credential_rejects_error_status() {
        let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
            401, "{}",
        )]));
        let client = client_with(transport, 100);
        assert!(!client.verify_credential("sessionid=abc").await.unwrap());
    }
}
