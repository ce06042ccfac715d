//! Error taxonomy surfaced to callers of the authenticated client

/// Why a call did not produce a successful response.
///
/// `Clone` because one refresh outcome fans out to every queued caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No response at all (connection, timeout), or a refresh that failed
    /// for reasons other than rejection. Credential state is unaffected.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-success status unrelated to auth.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The credential was refused again after a successful refresh.
    #[error("not authorized: {0}")]
    Auth(String),

    /// The refresh evidence was rejected or the session was torn down.
    /// Callers should start a new login.
    #[error("session ended: {0}")]
    SessionEnded(String),
}

impl Error {
    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Error::Auth(_) | Error::SessionEnded(_) => false,
        }
    }

    pub fn is_session_ended(&self) -> bool {
        matches!(self, Error::SessionEnded(_))
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport_failure",
            Error::Status { .. } => "status",
            Error::Auth(_) => "auth_failure",
            Error::SessionEnded(_) => "session_ended",
        }
    }
}

impl From<transport::TransportError> for Error {
    fn from(e: transport::TransportError) -> Self {
        Error::Transport(e.to_string())
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
