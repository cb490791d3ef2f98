use std::fmt;

use thiserror::Error;

/// The closed set of soft-failure kinds an upstream response can be
/// classified into. Callers branch on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// 200 response whose body is not the expected structured format,
    /// which in practice means the presented session cookie is dead.
    InvalidSession,
    /// Upstream returned 429.
    RateLimited,
    /// Upstream returned 403.
    Forbidden,
    /// Upstream returned 401.
    Unauthenticated,
    /// An anti-automation interstitial was detected in the body text.
    ChallengeRequired,
    /// Network-level failure (connect, DNS, timeout) or body read error.
    Transport,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidSession => "invalid_session",
            Self::RateLimited => "rate_limited",
            Self::Forbidden => "forbidden",
            Self::Unauthenticated => "unauthenticated",
            Self::ChallengeRequired => "challenge_required",
            Self::Transport => "transport",
        };
        f.write_str(name)
    }
}

/// A retryable upstream rejection, carried as data rather than raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl SoftFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SoftFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Every retry attempt was rejected; carries the final classification.
    #[error("upstream rejected request: {0}")]
    Exhausted(SoftFailure),
    #[error("user not found")]
    UserNotFound,
    #[error("video id not found in url: {0}")]
    VideoIdNotFound(String),
    #[error("download link not found in resolver response")]
    DownloadLinkNotFound,
    #[error("other: {0}")]
    Other(String),
}

impl ClientError {
    /// Whether the error represents an upstream rejection (as opposed to a
    /// local parse/IO problem) and may succeed later with other credentials.
    pub fn is_upstream_rejection(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
}
