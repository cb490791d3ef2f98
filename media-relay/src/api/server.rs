//! API server setup and configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use axum::Router;
use axum::extract::Request;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use upstream_client::credentials::CredentialStore;
use upstream_client::instagram::{FeedLimits, InstagramClient, default_headers};
use upstream_client::requester::{HttpTransport, RequestPolicy, SessionRequester};
use upstream_client::tiktok::TikTokClient;

use crate::api::middleware::rate_limit::RateLimiter;
use crate::api::routes;
use crate::config::RelayConfig;
use crate::error::Result;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
        }
    }
}

impl ApiServerConfig {
    /// Load API server config from environment variables, falling back to
    /// defaults.
    ///
    /// Supported env vars:
    /// - `API_BIND_ADDRESS` (e.g. "0.0.0.0")
    /// - `API_PORT` (e.g. "5000")
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(bind_address) = std::env::var("API_BIND_ADDRESS")
            && !bind_address.trim().is_empty()
        {
            config.bind_address = bind_address;
        }

        if let Ok(port) = std::env::var("API_PORT")
            && let Ok(parsed) = port.parse::<u16>()
        {
            config.port = parsed;
        }

        config
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Monotonically increasing count of liveness-tracked requests
    pub requests_served: Arc<AtomicU64>,
    /// Timestamp of the most recent liveness probe
    pub last_check: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Session credential store shared across request handlers
    pub credential_store: Arc<CredentialStore>,
    /// Profile/story/feed client
    pub instagram: Arc<InstagramClient>,
    /// Video re-download client
    pub tiktok: Arc<TikTokClient>,
    /// Per-client fixed-window rate limiter
    pub rate_limiter: Arc<RateLimiter>,
    /// Relay configuration
    pub config: Arc<RelayConfig>,
}

impl AppState {
    /// Build the full state graph from configuration.
    pub fn from_config(config: RelayConfig) -> Result<Self> {
        let store = Arc::new(
            CredentialStore::from_spec(&config.session_cookies)
                .with_rotate_interval(config.rotate_interval),
        );

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(upstream_client::ClientError::Http)?;

        let transport = Arc::new(HttpTransport::new(client.clone(), config.request_timeout));
        let policy = RequestPolicy {
            retry_limit: config.retry_limit,
            base_delay: config.base_delay,
            jitter_max: config.jitter_max,
        };
        let requester = SessionRequester::new(
            transport.clone(),
            store.clone(),
            policy,
            default_headers(&config.user_agent),
        );
        let limits = FeedLimits {
            max_posts: config.max_posts,
            page_pause: config.page_pause,
        };
        let instagram = Arc::new(InstagramClient::new(
            requester,
            transport,
            limits,
            config.user_agent.clone(),
        ));
        let tiktok = Arc::new(TikTokClient::with_client(client));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_per_minute,
            config.rate_limit_per_hour,
            config.rate_limit_per_day,
        ));

        Ok(Self {
            start_time: Instant::now(),
            requests_served: Arc::new(AtomicU64::new(0)),
            last_check: Arc::new(Mutex::new(None)),
            credential_store: store,
            instagram,
            tiktok,
            rate_limiter,
            config: Arc::new(config),
        })
    }

    /// Record a liveness probe and return the updated counter value.
    pub fn touch_liveness(&self) -> (DateTime<Utc>, u64) {
        let now = Utc::now();
        *self.last_check.lock() = Some(now);
        let served = self
            .requests_served
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        (now, served)
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    /// Create with application state.
    pub fn with_state(config: ApiServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    fn build_router(&self) -> Router {
        let mut router = routes::create_router(self.state.clone());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router.layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
            // Liveness probes poll constantly; keep them out of the logs.
            if matches!(req.uri().path(), "/" | "/uptime") {
                Span::none()
            } else {
                let mut make_span =
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                use tower_http::trace::MakeSpan;
                make_span.make_span(req)
            }
        }))
    }

    /// Start the server.
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| crate::error::Error::ApiError(format!("Invalid address: {e}")))?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("API server listening on http://{}", addr);

        let cancel_token = self.cancel_token.clone();

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            tracing::info!("API server shutting down...");
        })
        .await
        .map_err(|e| crate::error::Error::ApiError(format!("Server error: {e}")))?;

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert!(config.enable_cors);
    }

    #[test]
    fn test_app_state_creation() {
        let state = AppState::from_config(RelayConfig::default()).unwrap();
        assert!(state.start_time.elapsed().as_secs() < 1);
        assert!(state.credential_store.is_empty());
    }

    #[test]
    fn test_liveness_counter_increments() {
        let state = AppState::from_config(RelayConfig::default()).unwrap();
        let (_, first) = state.touch_liveness();
        let (_, second) = state.touch_liveness();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert!(state.last_check.lock().is_some());
    }

    #[test]
    fn test_server_creation() {
        let state = AppState::from_config(RelayConfig::default()).unwrap();
        let server = ApiServer::with_state(ApiServerConfig::default(), state);

        let token = server.cancel_token();
        assert!(!token.is_cancelled());
    }
}
