//! Pure classification of raw upstream responses.
//!
//! The upstream APIs are undocumented and signal session problems through a
//! mix of status codes and interstitial HTML, so classification inspects
//! both. This module performs no I/O and holds no state; rotation and retry
//! decisions belong to [`crate::requester`].

use crate::error::{FailureKind, SoftFailure};
use crate::requester::RawResponse;

/// Body substrings that mark an anti-automation challenge page.
pub const CHALLENGE_INDICATORS: [&str; 7] = [
    "challenge_required",
    "login_required",
    "checkpoint_required",
    "verify_phone_number",
    "verify_email",
    "suspicious_activity",
    "temporarily_blocked",
];

/// Outcome of inspecting a single upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success,
    SoftFailure(SoftFailure),
}

impl Classification {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Classify a raw response. First match wins, in this order: unparseable 200
/// body, 429, 403, 401, challenge indicators in the body text, success.
pub fn classify(response: &RawResponse) -> Classification {
    let status = response.status.as_u16();

    if status == 200 && serde_json::from_str::<serde_json::Value>(&response.body).is_err() {
        return Classification::SoftFailure(SoftFailure::new(
            FailureKind::InvalidSession,
            "invalid cookie or session expired",
        ));
    }

    match status {
        429 => {
            return Classification::SoftFailure(SoftFailure::new(
                FailureKind::RateLimited,
                "rate limit exceeded",
            ));
        }
        403 => {
            return Classification::SoftFailure(SoftFailure::new(
                FailureKind::Forbidden,
                "access forbidden",
            ));
        }
        401 => {
            return Classification::SoftFailure(SoftFailure::new(
                FailureKind::Unauthenticated,
                "authentication required",
            ));
        }
        _ => {}
    }

    let lowered = response.body.to_lowercase();
    let found: Vec<&str> = CHALLENGE_INDICATORS
        .iter()
        .copied()
        .filter(|indicator| lowered.contains(indicator))
        .collect();

    if !found.is_empty() {
        return Classification::SoftFailure(SoftFailure::new(
            FailureKind::ChallengeRequired,
            format!("challenge required: {}", found.join(", ")),
        ));
    }

    Classification::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn ok_json_is_success() {
        let result = classify(&response(200, r#"{"data": {"user": {}}}"#));
        assert!(result.is_success());
    }

    #[test]
    fn ok_html_is_invalid_session() {
        let result = classify(&response(200, "<html>Please log in</html>"));
        match result {
            Classification::SoftFailure(f) => assert_eq!(f.kind, FailureKind::InvalidSession),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn status_codes_map_to_kinds() {
        let cases = [
            (429, FailureKind::RateLimited),
            (403, FailureKind::Forbidden),
            (401, FailureKind::Unauthenticated),
        ];
        for (status, kind) in cases {
            match classify(&response(status, "{}")) {
                Classification::SoftFailure(f) => assert_eq!(f.kind, kind),
                other => panic!("status {status} classified as {other:?}"),
            }
        }
    }

    #[test]
    fn challenge_indicators_are_collected_in_order() {
        let body = r#"{"message": "checkpoint_required", "detail": "suspicious_activity"}"#;
        match classify(&response(200, body)) {
            Classification::SoftFailure(f) => {
                assert_eq!(f.kind, FailureKind::ChallengeRequired);
                assert_eq!(
                    f.reason,
                    "challenge required: checkpoint_required, suspicious_activity"
                );
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn indicator_scan_is_case_insensitive() {
        let body = r#"{"message": "CHALLENGE_REQUIRED"}"#;
        match classify(&response(200, body)) {
            Classification::SoftFailure(f) => assert_eq!(f.kind, FailureKind::ChallengeRequired),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let resp = response(429, "slow down");
        assert_eq!(classify(&resp), classify(&resp));
    }

    #[test]
    fn unrelated_error_status_with_json_body_is_success() {
        // Non-signal statuses fall through: the caller surfaces them from the
        // parsed body rather than the classifier guessing.
        assert!(classify(&response(404, r#"{"status": "fail"}"#)).is_success());
    }
}
