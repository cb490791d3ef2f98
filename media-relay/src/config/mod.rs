//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use tracing::warn;
use upstream_client::requester::RetryLimit;

/// Relay configuration, sourced from the environment with sensible defaults.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Raw credential spec in `name::secret||name2::secret2` form.
    pub session_cookies: String,
    /// User agent presented to the profile upstream.
    pub user_agent: String,
    /// Fixed component of the pre-request pacing delay; also the backoff base.
    pub base_delay: Duration,
    /// Upper bound of the random jitter added before each upstream request.
    pub jitter_max: Duration,
    /// Per-call upstream timeout.
    pub request_timeout: Duration,
    /// Attempt budget per logical request.
    pub retry_limit: RetryLimit,
    /// Optional time-based credential rotation interval.
    pub rotate_interval: Option<Duration>,
    /// Feed pagination cap.
    pub max_posts: usize,
    /// Pause between feed pages.
    pub page_pause: Duration,
    /// Directory for re-downloaded videos.
    pub download_dir: String,
    /// Fixed-window rate limits per client.
    pub rate_limit_per_minute: u32,
    pub rate_limit_per_hour: u32,
    pub rate_limit_per_day: u32,
    /// Optional directory for rolling log files. Console-only when unset.
    pub log_dir: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            session_cookies: String::new(),
            user_agent: upstream_client::DEFAULT_UA.to_string(),
            base_delay: Duration::from_secs(2),
            jitter_max: Duration::from_secs(2),
            request_timeout: Duration::from_secs(15),
            retry_limit: RetryLimit::PerCredential,
            rotate_interval: None,
            max_posts: 100,
            page_pause: Duration::from_secs(1),
            download_dir: "downloads".to_string(),
            rate_limit_per_minute: 5,
            rate_limit_per_hour: 20,
            rate_limit_per_day: 100,
            log_dir: None,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(name, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    ///
    /// Supported env vars:
    /// - `SESSION_COOKIES` (`name::secret||name2::secret2`)
    /// - `UPSTREAM_USER_AGENT`
    /// - `PACING_BASE_MS`, `PACING_JITTER_MS`
    /// - `UPSTREAM_TIMEOUT_SECS`
    /// - `RETRY_LIMIT` ("per-credential" or an attempt count)
    /// - `ROTATE_INTERVAL_MINS` (0 disables timer rotation)
    /// - `MAX_POSTS`, `PAGE_PAUSE_MS`
    /// - `DOWNLOAD_DIR`
    /// - `RATE_LIMIT_PER_MINUTE`, `RATE_LIMIT_PER_HOUR`, `RATE_LIMIT_PER_DAY`
    /// - `LOG_DIR`
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Some(cookies) = env_var("SESSION_COOKIES") {
            config.session_cookies = cookies;
        }
        if let Some(ua) = env_var("UPSTREAM_USER_AGENT") {
            config.user_agent = ua;
        }
        if let Some(ms) = env_parsed::<u64>("PACING_BASE_MS") {
            config.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parsed::<u64>("PACING_JITTER_MS") {
            config.jitter_max = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parsed::<u64>("UPSTREAM_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = env_var("RETRY_LIMIT") {
            config.retry_limit = match raw.trim() {
                "per-credential" => RetryLimit::PerCredential,
                other => match other.parse::<u32>() {
                    Ok(n) if n >= 1 => RetryLimit::Fixed(n),
                    _ => {
                        warn!(value = %raw, "ignoring invalid RETRY_LIMIT");
                        RetryLimit::PerCredential
                    }
                },
            };
        }
        if let Some(mins) = env_parsed::<u64>("ROTATE_INTERVAL_MINS") {
            config.rotate_interval = (mins > 0).then(|| Duration::from_secs(mins * 60));
        }
        if let Some(n) = env_parsed::<usize>("MAX_POSTS") {
            config.max_posts = n.max(1);
        }
        if let Some(ms) = env_parsed::<u64>("PAGE_PAUSE_MS") {
            config.page_pause = Duration::from_millis(ms);
        }
        if let Some(dir) = env_var("DOWNLOAD_DIR") {
            config.download_dir = dir;
        }
        if let Some(n) = env_parsed::<u32>("RATE_LIMIT_PER_MINUTE") {
            config.rate_limit_per_minute = n;
        }
        if let Some(n) = env_parsed::<u32>("RATE_LIMIT_PER_HOUR") {
            config.rate_limit_per_hour = n;
        }
        if let Some(n) = env_parsed::<u32>("RATE_LIMIT_PER_DAY") {
            config.rate_limit_per_day = n;
        }
        config.log_dir = env_var("LOG_DIR");

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RelayConfig::default();
        assert_eq!(config.base_delay, Duration::from_secs(2));
        assert_eq!(config.jitter_max, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.retry_limit, RetryLimit::PerCredential);
        assert!(config.rotate_interval.is_none());
        assert_eq!(config.max_posts, 100);
        assert_eq!(config.rate_limit_per_minute, 5);
        assert_eq!(config.rate_limit_per_hour, 20);
        assert_eq!(config.rate_limit_per_day, 100);
    }
}
