//! Retry orchestration around upstream HTTP calls.
//!
//! [`SessionRequester`] sits between the API handlers and the upstream
//! services: it presents the current session credential, paces requests,
//! classifies each response, and rotates credentials between attempts with
//! exponential backoff. Network failures and upstream soft failures are
//! normalized into the same [`SoftFailure`] result value so callers branch
//! on one closed taxonomy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};

use crate::classify::{Classification, classify};
use crate::credentials::CredentialStore;
use crate::error::{FailureKind, SoftFailure};

/// Status and body text of one upstream response, decoupled from the
/// transport so classification stays pure and tests can fabricate them.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Transport seam. The production implementation issues real HTTP requests;
/// tests substitute scripted responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
    ) -> Result<RawResponse, String>;
}

/// `reqwest`-backed transport with a bounded per-call timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
    ) -> Result<RawResponse, String> {
        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok(RawResponse { status, body })
    }
}

/// How many attempts a single logical request is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// Try every known credential once (minimum one attempt).
    PerCredential,
    /// Fixed attempt count regardless of credential count.
    Fixed(u32),
}

impl RetryLimit {
    pub fn attempts(&self, credential_count: usize) -> u32 {
        match self {
            Self::PerCredential => (credential_count as u32).max(1),
            Self::Fixed(n) => (*n).max(1),
        }
    }
}

/// Pacing and retry knobs for [`SessionRequester`]. Delays exist to avoid
/// tripping upstream abuse detection and must be zeroable for tests.
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    pub retry_limit: RetryLimit,
    /// Fixed component of the pre-request delay; also the backoff base.
    pub base_delay: Duration,
    /// Upper bound of the uniform random jitter added before each request.
    pub jitter_max: Duration,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            retry_limit: RetryLimit::PerCredential,
            base_delay: Duration::from_secs(2),
            jitter_max: Duration::from_secs(2),
        }
    }
}

impl RequestPolicy {
    /// Zero-delay policy for tests.
    pub fn immediate(retry_limit: RetryLimit) -> Self {
        Self {
            retry_limit,
            base_delay: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }

    fn pacing_delay(&self) -> Duration {
        let jitter = self.jitter_max.as_secs_f64() * rand::random::<f64>();
        self.base_delay + Duration::from_secs_f64(jitter)
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Orchestrates one upstream call: credential selection, pacing, transport,
/// classification, rotation, backoff.
pub struct SessionRequester {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    policy: RequestPolicy,
    base_headers: HeaderMap,
}

impl SessionRequester {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        policy: RequestPolicy,
        base_headers: HeaderMap,
    ) -> Self {
        Self {
            transport,
            store,
            policy,
            base_headers,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Issue a request with retry and rotation. Success short-circuits; the
    /// final attempt's failure is returned as a value, never raised.
    pub async fn request(&self, method: Method, url: &str) -> Result<RawResponse, SoftFailure> {
        let max_attempts = self.policy.retry_limit.attempts(self.store.len());
        let mut last_failure = SoftFailure::new(FailureKind::Transport, "no attempts made");

        for attempt in 0..max_attempts {
            if attempt > 0 {
                self.store.rotate();
            }

            let delay = self.policy.pacing_delay();
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }

            let headers = self.headers_for_attempt();
            debug!(
                url,
                attempt = attempt + 1,
                max_attempts,
                credential_index = self.store.current_index(),
                "issuing upstream request"
            );

            let outcome = self.transport.send(method.clone(), url, headers).await;

            let failure = match outcome {
                Ok(response) => match classify(&response) {
                    Classification::Success => return Ok(response),
                    Classification::SoftFailure(failure) => failure,
                },
                Err(reason) => SoftFailure::new(FailureKind::Transport, reason),
            };

            warn!(
                url,
                attempt = attempt + 1,
                kind = %failure.kind,
                reason = %failure.reason,
                "upstream request attempt failed"
            );
            last_failure = failure;

            if attempt + 1 < max_attempts {
                let backoff = self.policy.backoff_delay(attempt);
                if backoff > Duration::ZERO {
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Err(last_failure)
    }

    fn headers_for_attempt(&self) -> HeaderMap {
        let mut headers = self.base_headers.clone();
        if let Some(credential) = self.store.current()
            && let Ok(value) = HeaderValue::from_str(&credential.secret)
        {
            headers.insert(reqwest::header::COOKIE, value);
        }
        headers
    }
}
