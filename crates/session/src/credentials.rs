//! In-memory credential store
//!
//! Holds the one live access credential of a session. `None` means the
//! session is unauthenticated (never signed in, or ended). The value lives in
//! a `tokio::sync::watch` channel so `get` and `set` are atomic with respect
//! to each other, and async observers can `subscribe`.
//!
//! Listeners registered with `on_change` run synchronously inside `set`,
//! before it returns. Sets are serialized so listeners observe changes in the
//! order they were made. A listener may call `get` but must not call `set`.

use std::sync::{Mutex, PoisonError};

use common::Secret;
use tokio::sync::watch;
use tracing::debug;

/// The access credential of the current session.
///
/// The token is opaque: the client never inspects its structure.
/// `issued_at` is a unix timestamp in milliseconds taken when the credential
/// was received.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: Secret<String>,
    pub issued_at: u64,
}

impl Credential {
    /// Wrap a freshly issued token, stamped with the current time.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            issued_at: now_millis(),
        }
    }

    /// Raw bearer value, for attaching to a request.
    pub fn token(&self) -> &str {
        self.access_token.expose()
    }
}

type Listener = Box<dyn Fn(Option<&Credential>) + Send + Sync>;

/// Thread-safe holder of the session's access credential.
pub struct CredentialStore {
    current: watch::Sender<Option<Credential>>,
    listeners: Mutex<Vec<Listener>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// An empty (unauthenticated) store.
    pub fn new() -> Self {
        Self {
            current: watch::Sender::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// A store that starts with `credential` (e.g. restored after login).
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: watch::Sender::new(Some(credential)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Clone of the current credential.
    pub fn get(&self) -> Option<Credential> {
        self.current.borrow().clone()
    }

    /// Whether a credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Replace the credential and notify every listener before returning.
    ///
    /// Setting `None` terminates the session.
    pub fn set(&self, credential: Option<Credential>) {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let notify = credential.clone();
        self.current.send_replace(credential);
        debug!(
            authenticated = notify.is_some(),
            listeners = listeners.len(),
            "credential changed"
        );
        for listener in listeners.iter() {
            listener(notify.as_ref());
        }
    }

    /// Register a listener called synchronously on every `set`.
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(Option<&Credential>) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Receiver that observes every credential change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.current.subscribe()
    }
}

/// Current unix time in milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
