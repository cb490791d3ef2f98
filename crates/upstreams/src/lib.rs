//! Session-rotating HTTP clients for the upstream platforms behind media-relay.
//!
//! The crate is split into the policy layer shared by every upstream call
//! (credential rotation, response classification, retry orchestration) and
//! per-platform client modules built on top of it.

pub mod classify;
pub mod credentials;
pub mod diagnostics;
pub mod error;
pub mod instagram;
pub mod requester;
pub mod tiktok;

pub use classify::{CHALLENGE_INDICATORS, Classification, classify};
pub use credentials::{Credential, CredentialEntry, CredentialStore};
pub use diagnostics::DiagnosticsReport;
pub use error::{ClientError, FailureKind, SoftFailure};
pub use requester::{
    HttpTransport, RawResponse, RequestPolicy, RetryLimit, SessionRequester, Transport,
};

/// Browser user agent presented to the upstream services by default.
pub const DEFAULT_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";
