//! Watermark-free video re-download flow.
//!
//! Three stages: extract the numeric video id from any of the public URL
//! shapes (resolving share short-links through their redirect), trade the id
//! for a clean media URL at the resolver service, then stream the media to
//! disk.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use futures::StreamExt;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::ClientError;

const RESOLVER_ENDPOINT: &str = "https://ssstik.io/abc";

/// Desktop browser identity used for the resolver, which rejects mobile
/// clients.
pub const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static VIDEO_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/video/(\d+)").unwrap());
static VIDEO_QUERY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]v=(\d+)").unwrap());
static TRAILING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)/?$").unwrap());

static TOKEN_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input[^>]*name="token"[^>]*value="([^"]+)""#).unwrap()
});
static TOKEN_INPUT_REVERSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input[^>]*value="([^"]+)"[^>]*name="token""#).unwrap()
});
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<a\s[^>]+>").unwrap());
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).unwrap());

/// Pull the video id out of a canonical URL. Share short-links must be
/// resolved to their canonical form first.
pub fn parse_video_id(url: &str) -> Option<String> {
    for re in [&*VIDEO_PATH_RE, &*VIDEO_QUERY_RE, &*TRAILING_ID_RE] {
        if let Some(captures) = re.captures(url) {
            return captures.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

/// Whether the URL is a share short-link that redirects to the canonical
/// video page.
pub fn is_short_link(url: &str) -> bool {
    url.contains("vt.tiktok.com") || url.contains("vm.tiktok.com") || url.contains("tiktok.com/t/")
}

fn find_token(page: &str) -> Option<String> {
    TOKEN_INPUT_RE
        .captures(page)
        .or_else(|| TOKEN_INPUT_REVERSED_RE.captures(page))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn find_download_href(page: &str) -> Option<String> {
    for anchor in ANCHOR_RE.find_iter(page) {
        let tag = anchor.as_str();
        if tag.contains("download_link") && tag.contains("without_watermark") {
            if let Some(href) = HREF_RE.captures(tag).and_then(|c| c.get(1)) {
                return Some(href.as_str().to_string());
            }
        }
    }
    None
}

/// Client for the video re-download flow.
pub struct TikTokClient {
    client: reqwest::Client,
    headers: HeaderMap,
}

impl TikTokClient {
    /// Build with the crate-default client configuration. Redirects are
    /// followed so short-links resolve transparently.
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(DESKTOP_UA),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=0"),
        );
        Self { client, headers }
    }

    /// Extract the video id from any supported URL shape, following the
    /// redirect of share short-links when needed.
    pub async fn extract_video_id(&self, url: &str) -> Result<String, ClientError> {
        let canonical = if is_short_link(url) {
            let response = self
                .client
                .get(url)
                .headers(self.headers.clone())
                .send()
                .await?;
            response.url().to_string()
        } else {
            url.to_string()
        };

        parse_video_id(&canonical).ok_or_else(|| ClientError::VideoIdNotFound(url.to_string()))
    }

    /// Trade a video id for a direct watermark-free media URL.
    pub async fn resolve_download_url(&self, video_id: &str) -> Result<String, ClientError> {
        let api_url = format!(
            "{RESOLVER_ENDPOINT}?url=https://www.tiktok.com/@tiktok/video/{video_id}"
        );

        let page = self
            .client
            .get(&api_url)
            .headers(self.headers.clone())
            .send()
            .await?
            .text()
            .await?;
        let token = find_token(&page)
            .ok_or_else(|| ClientError::Other("resolver token not found".to_string()))?;

        debug!(video_id, "acquired resolver token");

        let form = [
            ("id", video_id),
            ("token", token.as_str()),
            ("tt_watermark", "off"),
        ];
        let result_page = self
            .client
            .post(&api_url)
            .headers(self.headers.clone())
            .form(&form)
            .send()
            .await?
            .text()
            .await?;

        find_download_href(&result_page).ok_or(ClientError::DownloadLinkNotFound)
    }

    /// Run the full flow and stream the media to `dest_dir`. Returns the
    /// written file path.
    pub async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, ClientError> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let video_id = self.extract_video_id(url).await?;
        info!(video_id, "resolving watermark-free media url");
        let media_url = self.resolve_download_url(&video_id).await?;

        let path = dest_dir.join(format!("tiktok_{video_id}.mp4"));
        let response = self
            .client
            .get(&media_url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        info!(video_id, bytes = written, path = %path.display(), "video downloaded");
        Ok(path)
    }
}
