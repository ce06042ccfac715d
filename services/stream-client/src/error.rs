//! Command-line errors

use thiserror::Error;

/// Problems with the arguments given to `magicstream-client`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("--config needs a path")]
    MissingConfigPath,

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("method {0} has no path")]
    MissingPath(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),
}

/// Result alias using CLI Error
pub type Result<T> = std::result::Result<T, Error>;
