//! Authenticated request client with single-flight credential refresh
//!
//! Wraps a `Transport` so that every call carries the session's access
//! credential, expiry signals (401) trigger at most one concurrent refresh,
//! and the calls that hit the expiry are retried once with the new token.
//!
//! Request lifecycle:
//! 1. `AuthClient::call` attaches the current bearer and sends
//! 2. Non-401 outcomes go straight back to the caller
//! 3. A first 401 hands the caller to the `RefreshCoordinator`
//! 4. The first such caller starts the refresh; later ones queue behind it
//! 5. Refresh succeeds → store updated, every queued caller retries once with the new token
//! 6. Refresh rejected → store cleared, every queued caller gets `SessionEnded`
//! 7. A 401 on the retry is final: `Auth`, never a second refresh

pub mod classify;
pub mod client;
pub mod coordinator;
pub mod error;
pub mod metrics;

#[cfg(test)]
mod test_support;

pub use client::AuthClient;
pub use coordinator::{RefreshCoordinator, RefreshState};
pub use error::{Error, Result};
