//! Single-flight refresh coordination
//!
//! The coordinator owns the only shared mutable state of the client: the
//! refresh state (`Idle` or `Refreshing`) and the FIFO queue of callers
//! waiting for a new credential. Both live behind one mutex that is never
//! held across an await.
//!
//! Transitions:
//! - Idle → Refreshing: first caller whose expiry signal came from the
//!   current credential. It spawns the refresh call and waits like everyone else.
//! - Refreshing: later expired callers queue behind the in-flight refresh.
//! - Refreshing → Idle (success): store updated, then every waiter receives
//!   the same new credential, in enqueue order.
//! - Refreshing → Idle (rejected): store cleared, every waiter receives
//!   `SessionEnded`, session-ended listeners run. No automatic refresh
//!   follows until a new credential is set.
//! - Refreshing → Idle (failed): every waiter receives `Transport`, store untouched.
//!
//! A caller only joins the queue while the store still holds the credential
//! that drew its expiry signal. An empty store means the session is over; a
//! different credential is handed back at once.
//!
//! The refresh runs on its own task so a caller abandoning its wait (its
//! deadline fired) can never strand the `Refreshing` state. An abandoned
//! waiter removes itself from the queue without affecting the others.
//!
//! Credential store listeners run while the coordinator lock is held and
//! must not call back into the coordinator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use session::{Credential, CredentialStore, Endpoints};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use transport::Transport;

use crate::classify::classify_refresh_error;
use crate::error::{Error, Result};

/// Whether a refresh call is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

type SessionEndedListener = Box<dyn Fn(&Error) + Send + Sync>;

/// A caller parked until the in-flight refresh resolves.
struct Waiter {
    id: u64,
    resume: oneshot::Sender<Result<Credential>>,
}

struct Inner {
    state: RefreshState,
    queue: VecDeque<Waiter>,
    next_waiter: u64,
    /// Bumped by `terminate`; a refresh started under an older generation
    /// must not write its result into the store.
    generation: u64,
}

impl Inner {
    fn enqueue(&mut self) -> (u64, oneshot::Receiver<Result<Credential>>) {
        let id = self.next_waiter;
        self.next_waiter += 1;
        let (resume, rx) = oneshot::channel();
        self.queue.push_back(Waiter { id, resume });
        (id, rx)
    }

    fn drain(&mut self) -> VecDeque<Waiter> {
        std::mem::take(&mut self.queue)
    }
}

struct Shared {
    inner: Mutex<Inner>,
    store: Arc<CredentialStore>,
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    session_ended: Mutex<Vec<SessionEndedListener>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_session_ended(&self, error: &Error) {
        let listeners = self
            .session_ended
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(error);
        }
    }
}

/// Coordinates credential refresh for one session.
pub struct RefreshCoordinator {
    shared: Arc<Shared>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: RefreshState::Idle,
                    queue: VecDeque::new(),
                    next_waiter: 0,
                    generation: 0,
                }),
                store,
                transport,
                endpoints,
                session_ended: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> RefreshState {
        self.shared.lock().state
    }

    /// Number of callers currently parked on the in-flight refresh.
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Register a listener run whenever a rejected refresh ends the session.
    pub fn on_session_ended<F>(&self, listener: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.shared
            .session_ended
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Obtain a credential newer than `stale`, the one that just drew an
    /// expiry signal.
    ///
    /// If the store already holds a different credential (a refresh finished
    /// while this caller's request was in flight) it is returned at once.
    /// If the store is empty the session is over. Otherwise the caller joins
    /// (or starts) the single in-flight refresh and waits for its outcome.
    pub async fn fresh_credential(&self, stale: &Credential) -> Result<Credential> {
        let (id, rx) = {
            let mut inner = self.shared.lock();
            match self.shared.store.get() {
                None => {
                    return Err(Error::SessionEnded("no active credential".to_string()));
                }
                Some(current) if !current.access_token.matches(stale.access_token.expose()) => {
                    debug!("credential already replaced, resuming with current");
                    return Ok(current);
                }
                Some(_) => {}
            }
            let waiter = inner.enqueue();
            match inner.state {
                RefreshState::Idle => {
                    inner.state = RefreshState::Refreshing;
                    info!("access credential expired, starting refresh");
                    tokio::spawn(run_refresh(self.shared.clone(), inner.generation));
                }
                RefreshState::Refreshing => {
                    debug!(pending = inner.queue.len(), "refresh in flight, queued");
                }
            }
            waiter
        };

        let _registration = Registration {
            shared: &self.shared,
            id,
        };
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::SessionEnded(
                "session torn down while waiting for refresh".to_string(),
            )),
        }
    }

    /// Start a new session with `credential`, e.g. after login.
    ///
    /// A refresh still in flight for an earlier session is discarded, and
    /// callers queued on it resume with the new credential.
    pub fn begin_session(&self, credential: Credential) {
        let waiters = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            self.shared.store.set(Some(credential.clone()));
            inner.drain()
        };
        if !waiters.is_empty() {
            info!(pending = waiters.len(), "new session, resuming queued callers");
        }
        for waiter in waiters {
            let _ = waiter.resume.send(Ok(credential.clone()));
        }
    }

    /// Tear the session down: clear the store and fail every queued caller
    /// with `SessionEnded`. An in-flight refresh is left to finish but its
    /// result is discarded.
    pub fn terminate(&self, reason: &str) {
        let waiters = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            self.shared.store.set(None);
            inner.drain()
        };
        if !waiters.is_empty() {
            info!(pending = waiters.len(), reason, "failing queued callers on teardown");
        }
        let error = Error::SessionEnded(reason.to_string());
        for waiter in waiters {
            let _ = waiter.resume.send(Err(error.clone()));
        }
    }
}

/// Removes an abandoned waiter from the queue when its future is dropped.
struct Registration<'a> {
    shared: &'a Shared,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        let before = inner.queue.len();
        inner.queue.retain(|w| w.id != self.id);
        if inner.queue.len() != before {
            debug!(waiter = self.id, "waiter abandoned before refresh resolved");
        }
    }
}

/// Perform the refresh and resolve every waiter.
///
/// A result from before `terminate` or `begin_session` is discarded. If
/// waiters queued for the newer session meanwhile, one more refresh runs for
/// them; if the store is empty by then they fail with `SessionEnded`.
async fn run_refresh(shared: Arc<Shared>, mut generation: u64) {
    loop {
        let started = Instant::now();
        let result =
            session::refresh_access_token(shared.transport.as_ref(), &shared.endpoints).await;
        let elapsed = started.elapsed().as_secs_f64();

        let (waiters, outcome) = {
            let mut inner = shared.lock();
            if inner.generation != generation {
                crate::metrics::record_refresh("discarded", elapsed);
                if inner.queue.is_empty() {
                    debug!("discarding refresh result for a torn-down session");
                    inner.state = RefreshState::Idle;
                    return;
                }
                if shared.store.is_authenticated() {
                    debug!(
                        pending = inner.queue.len(),
                        "session replaced during refresh, refreshing again"
                    );
                    generation = inner.generation;
                    continue;
                }
                inner.state = RefreshState::Idle;
                let stranded = inner.drain();
                drop(inner);
                warn!(failed = stranded.len(), "session ended during refresh");
                let error = Error::SessionEnded("session ended during refresh".to_string());
                for waiter in stranded {
                    let _ = waiter.resume.send(Err(error.clone()));
                }
                return;
            }

            let outcome = match result {
                Ok(credential) => {
                    shared.store.set(Some(credential.clone()));
                    Ok(credential)
                }
                Err(e) => {
                    let error = classify_refresh_error(e);
                    if error.is_session_ended() {
                        shared.store.set(None);
                    }
                    Err(error)
                }
            };
            inner.state = RefreshState::Idle;
            (inner.drain(), outcome)
        };

        match &outcome {
            Ok(_) => {
                crate::metrics::record_refresh("success", elapsed);
                info!(resumed = waiters.len(), "refresh succeeded");
            }
            Err(e) if e.is_session_ended() => {
                crate::metrics::record_refresh("rejected", elapsed);
                warn!(failed = waiters.len(), error = %e, "refresh rejected, session ended");
            }
            Err(e) => {
                crate::metrics::record_refresh("failed", elapsed);
                warn!(failed = waiters.len(), error = %e, "refresh failed, credential unchanged");
            }
        }

        for waiter in waiters {
            let _ = waiter.resume.send(outcome.clone());
        }
        if let Err(e) = &outcome
            && e.is_session_ended()
        {
            shared.notify_session_ended(e);
        }
        return;
    }
}
