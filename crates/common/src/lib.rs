//! Shared types for the MagicStream session client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
