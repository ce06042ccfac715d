//! Scripted in-memory backend for coordinator and client tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use transport::{ApiRequest, RawResponse, Transport, TransportError};

/// What the fake `/refresh` endpoint does.
#[derive(Debug, Clone)]
pub enum RefreshReply {
    /// 200 with this token, which data endpoints then accept
    Token(String),
    /// Bare status (401/403 rejection, 5xx failure)
    Status(u16),
    /// Connection error
    Unreachable,
}

/// Data endpoints accept exactly one token; `/refresh` mints the next one.
///
/// - `/boom` answers 500
/// - `/login` signs in as `u-1` with token `L0`, which becomes the valid one
/// - with `hold_refresh` set, `/refresh` parks until `release_refresh()`
/// - with `hold_slow` set, `/slow` parks after logging until `release_slow()`
pub struct FakeBackend {
    valid_token: Mutex<String>,
    refresh_reply: Mutex<RefreshReply>,
    reject_all: AtomicBool,
    hold_refresh: AtomicBool,
    release: Notify,
    hold_slow: AtomicBool,
    slow_gate: Notify,
    pub refresh_calls: AtomicUsize,
    pub expired_seen: AtomicUsize,
    /// (path, bearer) of every non-refresh request, in arrival order
    pub log: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeBackend {
    pub fn new(valid_token: &str, refresh_reply: RefreshReply) -> Self {
        Self {
            valid_token: Mutex::new(valid_token.to_string()),
            refresh_reply: Mutex::new(refresh_reply),
            reject_all: AtomicBool::new(false),
            hold_refresh: AtomicBool::new(false),
            release: Notify::new(),
            hold_slow: AtomicBool::new(false),
            slow_gate: Notify::new(),
            refresh_calls: AtomicUsize::new(0),
            expired_seen: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Make every token stale, as if the access token expired server-side.
    pub fn expire(&self, next_valid: &str) {
        *self.valid_token.lock().unwrap() = next_valid.to_string();
    }

    pub fn set_refresh_reply(&self, reply: RefreshReply) {
        *self.refresh_reply.lock().unwrap() = reply;
    }

    /// Data endpoints answer 401 whatever token is presented.
    pub fn reject_all(&self) {
        self.reject_all.store(true, Ordering::SeqCst);
    }

    pub fn hold_refresh(&self) {
        self.hold_refresh.store(true, Ordering::SeqCst);
    }

    pub fn release_refresh(&self) {
        self.hold_refresh.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    pub fn hold_slow(&self) {
        self.hold_slow.store(true, Ordering::SeqCst);
    }

    pub fn release_slow(&self) {
        self.hold_slow.store(false, Ordering::SeqCst);
        self.slow_gate.notify_one();
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn bearers_for(&self, path: &str) -> Vec<Option<String>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .collect()
    }

    async fn respond(&self, request: ApiRequest) -> transport::Result<RawResponse> {
        if request.path == "/refresh" {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if self.hold_refresh.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            let reply = self.refresh_reply.lock().unwrap().clone();
            return match reply {
                RefreshReply::Token(token) => {
                    *self.valid_token.lock().unwrap() = token.clone();
                    Ok(RawResponse::new(
                        200,
                        format!(r#"{{"access_token":"{token}"}}"#),
                    ))
                }
                RefreshReply::Status(status) => Ok(RawResponse::new(status, "refresh refused")),
                RefreshReply::Unreachable => {
                    Err(TransportError::Connect("connection refused".into()))
                }
            };
        }

        if request.path == "/login" {
            *self.valid_token.lock().unwrap() = "L0".to_string();
            return Ok(RawResponse::new(
                200,
                r#"{"userId":"u-1","email":"ada@example.com","access_token":"L0"}"#,
            ));
        }

        let bearer = request.bearer().map(str::to_string);
        self.log
            .lock()
            .unwrap()
            .push((request.path.clone(), bearer.clone()));

        if request.path == "/slow" && self.hold_slow.load(Ordering::SeqCst) {
            self.slow_gate.notified().await;
        }
        if request.path == "/boom" {
            return Ok(RawResponse::new(500, "internal error"));
        }
        let valid = self.valid_token.lock().unwrap().clone();
        if !self.reject_all.load(Ordering::SeqCst) && bearer.as_deref() == Some(valid.as_str()) {
            return Ok(RawResponse::new(
                200,
                format!(r#"{{"path":"{}","token":"{valid}"}}"#, request.path),
            ));
        }
        self.expired_seen.fetch_add(1, Ordering::SeqCst);
        Ok(RawResponse::new(401, "token expired"))
    }
}

impl Transport for FakeBackend {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = transport::Result<RawResponse>> + Send + '_>> {
        Box::pin(self.respond(request))
    }
}

/// Yield until `condition` holds; panics after five seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached");
}
