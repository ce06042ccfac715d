//! Error types for session exchanges

/// Errors from login, refresh and logout.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
