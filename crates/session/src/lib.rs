//! Session credentials for the MagicStream backend
//!
//! Holds the short-lived access credential for one signed-in session and
//! performs the three exchanges that create, renew and end it. The refresh
//! evidence itself (an HttpOnly cookie) never passes through this crate; the
//! transport's cookie store replays it.
//!
//! Credential flow:
//! 1. `token::login()` posts email/password, returns the profile + access credential
//! 2. The credential is placed in `CredentialStore` (session begins)
//! 3. On an expiry signal, `token::refresh_access_token()` mints a new one
//! 4. A rejected refresh or `token::logout()` clears the store (session ends)

pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod token;

pub use credentials::{Credential, CredentialStore};
pub use endpoints::{ACCESS_TOKEN_COOKIE, Endpoints, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
pub use error::{Error, Result};
pub use token::{Genre, LoginSession, UserProfile, login, logout, refresh_access_token};
