//! Backend routes used by the session exchanges

/// Login route: `POST {email, password}`
pub const LOGIN_PATH: &str = "/login";

/// Refresh route: `POST` with the refresh cookie, no Authorization header
pub const REFRESH_PATH: &str = "/refresh";

/// Logout route: `POST {user_id}`
pub const LOGOUT_PATH: &str = "/logout";

/// Cookie the backend uses to hand out the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Paths of the session endpoints, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub refresh: String,
    pub logout: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: LOGIN_PATH.to_string(),
            refresh: REFRESH_PATH.to_string(),
            logout: LOGOUT_PATH.to_string(),
        }
    }
}

impl Endpoints {
    /// Whether `path` addresses the refresh endpoint (query string ignored).
    pub fn is_refresh(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        path.trim_end_matches('/') == self.refresh.trim_end_matches('/')
    }
}
