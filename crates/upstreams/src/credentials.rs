//! Session credential storage and rotation.
//!
//! The store owns an ordered set of opaque session cookies, tracks which one
//! is active, and rotates circularly on demand. State is process-lifetime
//! only; a restart reloads the configured initial set. All mutation goes
//! through a single mutex so concurrent request handlers never observe a
//! torn rotation.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Number of secret characters exposed in display snapshots.
const SECRET_PREVIEW_LEN: usize = 50;

/// A single named session credential. Identity is the secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    pub secret: String,
}

/// Display-safe view of one stored credential.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialEntry {
    pub index: usize,
    pub name: String,
    /// Secret truncated for display.
    pub secret_preview: String,
    pub is_active: bool,
}

#[derive(Debug)]
struct StoreState {
    credentials: Vec<Credential>,
    current_index: usize,
    last_rotation: Instant,
}

/// Mutable, ordered collection of session credentials with a shared
/// "current" cursor.
#[derive(Debug)]
pub struct CredentialStore {
    state: Mutex<StoreState>,
    /// When set, `current()` rotates first if this much time has passed
    /// since the last rotation. `None` means rotate only on observed
    /// failure.
    rotate_interval: Option<Duration>,
}

impl CredentialStore {
    /// Create a store from an initial credential set. Duplicate secrets in
    /// the input are dropped, keeping the first occurrence.
    pub fn new(initial: Vec<Credential>) -> Self {
        let mut credentials: Vec<Credential> = Vec::with_capacity(initial.len());
        for credential in initial {
            if credential.secret.is_empty() {
                continue;
            }
            if credentials.iter().any(|c| c.secret == credential.secret) {
                debug!(name = %credential.name, "dropping duplicate credential secret");
                continue;
            }
            credentials.push(credential);
        }

        if credentials.is_empty() {
            warn!("no session credentials configured; requests will go out unauthenticated");
        } else {
            info!(count = credentials.len(), "credential store initialized");
        }

        Self {
            state: Mutex::new(StoreState {
                credentials,
                current_index: 0,
                last_rotation: Instant::now(),
            }),
            rotate_interval: None,
        }
    }

    /// Parse the `name::secret||name::secret` environment format. Entries
    /// without a `::` separator are treated as bare secrets and auto-named.
    pub fn from_spec(spec: &str) -> Self {
        let mut credentials = Vec::new();
        for pair in spec.split("||") {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            match pair.split_once("::") {
                Some((name, secret)) => credentials.push(Credential {
                    name: name.trim().to_string(),
                    secret: secret.trim().to_string(),
                }),
                None => credentials.push(Credential {
                    name: format!("Cookie {}", credentials.len() + 1),
                    secret: pair.to_string(),
                }),
            }
        }
        Self::new(credentials)
    }

    /// Enable time-based rotation in addition to rotation on failure.
    pub fn with_rotate_interval(mut self, interval: Option<Duration>) -> Self {
        self.rotate_interval = interval;
        self
    }

    /// The credential at the current cursor, or `None` when the store is
    /// empty. Applies the optional time-based rotation policy first.
    pub fn current(&self) -> Option<Credential> {
        let mut state = self.state.lock();

        if let Some(interval) = self.rotate_interval
            && state.credentials.len() > 1
            && state.last_rotation.elapsed() >= interval
        {
            let from = state.current_index;
            state.current_index = (state.current_index + 1) % state.credentials.len();
            state.last_rotation = Instant::now();
            info!(from, to = state.current_index, "rotated credential on timer");
        }

        state.credentials.get(state.current_index).cloned()
    }

    /// Advance the cursor circularly. No-op with a warning when fewer than
    /// two credentials exist.
    pub fn rotate(&self) {
        let mut state = self.state.lock();
        if state.credentials.len() < 2 {
            warn!("cannot rotate credential: fewer than two available");
            return;
        }
        let from = state.current_index;
        state.current_index = (state.current_index + 1) % state.credentials.len();
        state.last_rotation = Instant::now();
        info!(
            from,
            to = state.current_index,
            total = state.credentials.len(),
            "rotated credential"
        );
    }

    /// Append a credential. Returns `false` (no mutation) when the secret is
    /// empty or already present, regardless of the name.
    pub fn add(&self, name: &str, secret: &str) -> bool {
        if secret.is_empty() {
            return false;
        }
        let mut state = self.state.lock();
        if state.credentials.iter().any(|c| c.secret == secret) {
            return false;
        }
        let name = if name.trim().is_empty() {
            format!("Cookie {}", state.credentials.len() + 1)
        } else {
            name.trim().to_string()
        };
        info!(name = %name, total = state.credentials.len() + 1, "added credential");
        state.credentials.push(Credential {
            name,
            secret: secret.to_string(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.state.lock().credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().credentials.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.state.lock().current_index
    }

    /// Display-safe listing for the credential-management endpoint.
    pub fn snapshot(&self) -> Vec<CredentialEntry> {
        let state = self.state.lock();
        state
            .credentials
            .iter()
            .enumerate()
            .map(|(index, credential)| {
                // Truncate on a char boundary; secrets are not guaranteed ASCII.
                let secret_preview = match credential
                    .secret
                    .char_indices()
                    .nth(SECRET_PREVIEW_LEN)
                {
                    Some((boundary, _)) => format!("{}...", &credential.secret[..boundary]),
                    None => credential.secret.clone(),
                };
                CredentialEntry {
                    index,
                    name: credential.name.clone(),
                    secret_preview,
                    is_active: index == state.current_index,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(n: usize) -> CredentialStore {
        CredentialStore::new(
            (0..n)
                .map(|i| Credential {
                    name: format!("c{i}"),
                    secret: format!("secret-{i}"),
                })
                .collect(),
        )
    }

    #[test]
    fn rotation_is_circular() {
        for n in 2..=5 {
            let store = store_of(n);
            assert_eq!(store.current_index(), 0);
            for _ in 0..n {
                store.rotate();
            }
            assert_eq!(store.current_index(), 0, "size {n} did not wrap");
        }
    }

    #[test]
    fn rotate_is_noop_below_two() {
        let empty = store_of(0);
        empty.rotate();
        assert_eq!(empty.current_index(), 0);

        let single = store_of(1);
        single.rotate();
        assert_eq!(single.current_index(), 0);
        assert_eq!(single.current().unwrap().secret, "secret-0");
    }

    #[test]
    fn current_is_none_when_empty() {
        assert!(store_of(0).current().is_none());
    }

    #[test]
    fn add_is_idempotent_on_secret() {
        let store = store_of(1);
        assert!(store.add("fresh", "secret-x"));
        assert_eq!(store.len(), 2);
        // Same secret under another name does not grow the store.
        assert!(!store.add("other name", "secret-x"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn add_rejects_empty_secret() {
        let store = store_of(1);
        assert!(!store.add("name", ""));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn from_spec_parses_named_and_bare_entries() {
        let store = CredentialStore::from_spec("main::sessionid=abc||sessionid=def");
        let entries = store.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "main");
        assert_eq!(entries[1].name, "Cookie 2");
        assert!(entries[0].is_active);
        assert!(!entries[1].is_active);
    }

    #[test]
    fn from_spec_skips_blank_and_duplicate_entries() {
        let store = CredentialStore::from_spec("a::s1|| ||b::s1||c::s2");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn snapshot_truncates_long_secrets() {
        let secret = "x".repeat(80);
        let store = CredentialStore::new(vec![Credential {
            name: "long".into(),
            secret: secret.clone(),
        }]);
        let entries = store.snapshot();
        assert_eq!(entries[0].secret_preview.len(), SECRET_PREVIEW_LEN + 3);
        assert!(entries[0].secret_preview.ends_with("..."));
    }

    #[test]
    fn snapshot_truncates_multibyte_secrets_on_char_boundary() {
        // A two-byte char straddling the preview cutoff must not split.
        let secret = format!("{}é{}", "x".repeat(SECRET_PREVIEW_LEN - 1), "y".repeat(30));
        let store = CredentialStore::new(vec![Credential {
            name: "utf8".into(),
            secret,
        }]);
        let entries = store.snapshot();
        assert_eq!(entries[0].secret_preview.chars().count(), SECRET_PREVIEW_LEN + 3);
        assert!(entries[0].secret_preview.ends_with("é..."));
    }

    #[test]
    fn snapshot_keeps_short_multibyte_secrets_whole() {
        let store = CredentialStore::new(vec![Credential {
            name: "short".into(),
            secret: "sessionid=héllo".into(),
        }]);
        assert_eq!(store.snapshot()[0].secret_preview, "sessionid=héllo");
    }

    #[test]
    fn timer_rotation_applies_on_access() {
        let store = store_of(3).with_rotate_interval(Some(Duration::ZERO));
        let first = store.current().unwrap();
        assert_eq!(first.secret, "secret-1");
        assert_eq!(store.current_index(), 1);
    }

    #[test]
    fn timer_rotation_disabled_by_default() {
        let store = store_of(3);
        store.current();
        store.current();
        assert_eq!(store.current_index(), 0);
    }
}
