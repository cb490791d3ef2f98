//! Per-request diagnostics accumulated across the scrape pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters mutated by every stage of a single request's pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticsStats {
    pub posts_processed: u64,
    pub posts_failed: u64,
    pub stories_processed: u64,
    pub stories_failed: u64,
    pub api_calls: u64,
    /// Wall-clock seconds spent serving the request, rounded to 2 decimals.
    pub processing_time: f64,
}

/// Structured diagnostics owned exclusively by one in-flight request and
/// mirrored back to the caller as the `debug` object.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub request_time: DateTime<Utc>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: DiagnosticsStats,
}

impl DiagnosticsReport {
    pub fn new() -> Self {
        Self {
            request_time: Utc::now(),
            errors: Vec::new(),
            warnings: Vec::new(),
            stats: DiagnosticsStats::default(),
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn record_elapsed(&mut self, started: std::time::Instant) {
        self.stats.processing_time = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
    }
}

impl Default for DiagnosticsReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_with_stats() {
        let mut report = DiagnosticsReport::new();
        report.stats.api_calls = 3;
        report.error("failed to fetch posts");
        report.warning("private account");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["api_calls"], 3);
        assert_eq!(json["errors"][0], "failed to fetch posts");
        assert_eq!(json["warnings"][0], "private account");
    }
}
