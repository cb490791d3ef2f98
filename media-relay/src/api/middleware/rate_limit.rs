//! Per-client fixed-window rate limiting.
//!
//! Three stacked windows (minute, hour, day) keyed by the forwarded client
//! address. State is in-memory only; limits reset on restart. Liveness paths
//! are exempt so external uptime monitors never burn the budget.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tracing::warn;

use crate::api::error::ApiError;
use crate::api::server::AppState;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self {
            started: now,
            count: 0,
        }
    }

    /// Count one hit, resetting first if the window has elapsed. Returns
    /// `false` when the hit exceeds the limit.
    fn hit(&mut self, now: Instant, span: Duration, limit: u32) -> bool {
        if now.duration_since(self.started) >= span {
            *self = Self::new(now);
        }
        if self.count >= limit {
            return false;
        }
        self.count += 1;
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct ClientWindows {
    minute: Window,
    hour: Window,
    day: Window,
}

/// Which window a rejected request ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Minute,
    Hour,
    Day,
}

impl LimitScope {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

/// Fixed-window limiter shared by all request handlers.
#[derive(Debug)]
pub struct RateLimiter {
    per_minute: u32,
    per_hour: u32,
    per_day: u32,
    clients: Mutex<HashMap<String, ClientWindows>>,
}

impl RateLimiter {
    pub fn new(per_minute: u32, per_hour: u32, per_day: u32) -> Self {
        Self {
            per_minute,
            per_hour,
            per_day,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Register one request for `key`. Returns the violated scope and its
    /// limit when the request must be rejected.
    pub fn check(&self, key: &str) -> Result<(), (LimitScope, u32)> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), (LimitScope, u32)> {
        let mut clients = self.clients.lock();
        // Drop clients whose day window has fully elapsed so the map does
        // not grow without bound across distinct (or spoofed) addresses.
        clients.retain(|_, windows| now.duration_since(windows.day.started) < DAY);
        let windows = clients.entry(key.to_string()).or_insert(ClientWindows {
            minute: Window::new(now),
            hour: Window::new(now),
            day: Window::new(now),
        });

        if !windows.day.hit(now, DAY, self.per_day) {
            return Err((LimitScope::Day, self.per_day));
        }
        if !windows.hour.hit(now, HOUR, self.per_hour) {
            return Err((LimitScope::Hour, self.per_hour));
        }
        if !windows.minute.hit(now, MINUTE, self.per_minute) {
            return Err((LimitScope::Minute, self.per_minute));
        }
        Ok(())
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}

fn is_exempt(path: &str) -> bool {
    matches!(path, "/" | "/uptime")
        || path.starts_with("/swagger-ui")
        || path.starts_with("/api-docs")
}

fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
        && !first.trim().is_empty()
    {
        return first.trim().to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware enforcing the per-client request budget.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let key = client_key(&request);
    match state.rate_limiter.check(&key) {
        Ok(()) => next.run(request).await,
        Err((scope, limit)) => {
            warn!(
                client = %key,
                scope = scope.as_str(),
                limit,
                path = %request.uri().path(),
                "rate limit exceeded"
            );
            ApiError::too_many_requests(format!(
                "rate limit exceeded: {limit} per {}",
                scope.as_str()
            ))
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_window_rejects_after_limit() {
        let limiter = RateLimiter::new(5, 100, 1000);
        let now = Instant::now();
        for _ in 0..5 {
            assert!(limiter.check_at("1.2.3.4", now).is_ok());
        }
        assert_eq!(
            limiter.check_at("1.2.3.4", now),
            Err((LimitScope::Minute, 5))
        );
    }

    #[test]
    fn minute_window_resets_after_elapse() {
        let limiter = RateLimiter::new(2, 100, 1000);
        let start = Instant::now();
        assert!(limiter.check_at("k", start).is_ok());
        assert!(limiter.check_at("k", start).is_ok());
        assert!(limiter.check_at("k", start).is_err());

        let later = start + MINUTE;
        assert!(limiter.check_at("k", later).is_ok());
    }

    #[test]
    fn clients_are_limited_independently() {
        let limiter = RateLimiter::new(1, 100, 1000);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_ok());
        assert!(limiter.check_at("b", now).is_ok());
        assert!(limiter.check_at("a", now).is_err());
    }

    #[test]
    fn day_window_outranks_minute_window() {
        let limiter = RateLimiter::new(10, 10, 2);
        let start = Instant::now();
        assert!(limiter.check_at("k", start).is_ok());
        assert!(limiter.check_at("k", start).is_ok());
        // A fresh minute does not help once the day budget is gone.
        let later = start + MINUTE * 2;
        assert_eq!(limiter.check_at("k", later), Err((LimitScope::Day, 2)));
    }

    #[test]
    fn stale_clients_are_evicted_after_a_day() {
        let limiter = RateLimiter::new(10, 10, 10);
        let start = Instant::now();
        for i in 0..100 {
            assert!(limiter.check_at(&format!("198.51.100.{i}"), start).is_ok());
        }
        assert_eq!(limiter.tracked_clients(), 100);

        // One live client a day later; every idle entry is swept.
        assert!(limiter.check_at("203.0.113.7", start + DAY).is_ok());
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn liveness_paths_are_exempt() {
        assert!(is_exempt("/"));
        assert!(is_exempt("/uptime"));
        assert!(is_exempt("/swagger-ui/index.html"));
        assert!(!is_exempt("/api/instagram/someone"));
    }
}
