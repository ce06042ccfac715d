//! Login, refresh and logout exchanges
//!
//! All three go straight through `Transport`, never through the
//! authenticated client: they are how a session starts, renews and ends.
//!
//! The refresh call carries no Authorization header. The backend identifies
//! the session by its HttpOnly refresh cookie, and the transport's cookie
//! store supplies it. The new access token is read from the JSON body
//! when present, otherwise from the `access_token` cookie the backend sets.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use transport::{ApiRequest, RawResponse, ResponseClass, Transport};

use crate::credentials::Credential;
use crate::endpoints::{ACCESS_TOKEN_COOKIE, Endpoints};
use crate::error::{Error, Result};

/// A genre the user marked as a favourite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Genre {
    #[serde(default)]
    pub genre_id: i64,
    #[serde(default)]
    pub genre_name: String,
}

/// Profile returned by the login endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub favorite_genres: Vec<Genre>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub profile: UserProfile,
    pub credential: Credential,
}

/// Token-bearing part of a login or refresh response body.
#[derive(Debug, Default, Deserialize)]
struct TokenBody {
    #[serde(default, alias = "accessToken", alias = "token")]
    access_token: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LogoutRequest<'a> {
    user_id: &'a str,
}

/// Pull the access token out of a 2xx response: body first, cookie second.
fn access_token_from(response: &RawResponse) -> Option<String> {
    response
        .json::<TokenBody>()
        .ok()
        .and_then(|b| b.access_token)
        .filter(|t| !t.is_empty())
        .or_else(|| response.cookie(ACCESS_TOKEN_COOKIE))
}

/// Exchange email and password for a profile and an access credential.
pub async fn login(
    transport: &dyn Transport,
    endpoints: &Endpoints,
    email: &str,
    password: &str,
) -> Result<LoginSession> {
    let body = serde_json::to_value(LoginRequest { email, password })
        .map_err(|e| Error::TokenExchange(format!("encoding login request: {e}")))?;
    let response = transport
        .send(ApiRequest::post(endpoints.login.as_str()).with_json(body))
        .await
        .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

    if response.status == 401 {
        return Err(Error::InvalidCredentials(
            "invalid email or password".to_string(),
        ));
    }
    if !response.is_success() {
        return Err(Error::TokenExchange(format!(
            "login endpoint returned {}: {}",
            response.status,
            response.text()
        )));
    }

    let profile: UserProfile = response
        .json()
        .map_err(|e| Error::TokenExchange(format!("invalid login response: {e}")))?;
    let token = access_token_from(&response).ok_or_else(|| {
        Error::TokenExchange("login response carried no access token".to_string())
    })?;

    info!(user_id = %profile.user_id, role = %profile.role, "signed in");
    Ok(LoginSession {
        profile,
        credential: Credential::new(token),
    })
}

/// Ask the backend for a new access credential.
///
/// 401/403 from the refresh endpoint means the refresh evidence itself is
/// invalid or expired and maps to `InvalidCredentials`. Anything else that
/// is not a usable 2xx maps to a retryable `Http`/`TokenExchange` error.
pub async fn refresh_access_token(
    transport: &dyn Transport,
    endpoints: &Endpoints,
) -> Result<Credential> {
    let response = transport
        .send(ApiRequest::post(endpoints.refresh.as_str()))
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    match ResponseClass::of_refresh(response.status) {
        ResponseClass::Success => {}
        ResponseClass::Rejected => {
            return Err(Error::InvalidCredentials(format!(
                "refresh rejected ({}): {}",
                response.status,
                response.text()
            )));
        }
        _ => {
            return Err(Error::TokenExchange(format!(
                "token refresh returned {}: {}",
                response.status,
                response.text()
            )));
        }
    }

    let token = access_token_from(&response).ok_or_else(|| {
        Error::TokenExchange("refresh response carried no access token".to_string())
    })?;
    debug!("refresh endpoint issued a new access token");
    Ok(Credential::new(token))
}

/// Tell the backend to invalidate the user's tokens and clear its cookies.
pub async fn logout(transport: &dyn Transport, endpoints: &Endpoints, user_id: &str) -> Result<()> {
    let body = serde_json::to_value(LogoutRequest { user_id })
        .map_err(|e| Error::TokenExchange(format!("encoding logout request: {e}")))?;
    let response = transport
        .send(ApiRequest::post(endpoints.logout.as_str()).with_json(body))
        .await
        .map_err(|e| Error::Http(format!("logout request failed: {e}")))?;

    if !response.is_success() {
        warn!(user_id, status = response.status, "logout endpoint refused");
        return Err(Error::TokenExchange(format!(
            "logout endpoint returned {}: {}",
            response.status,
            response.text()
        )));
    }
    info!(user_id, "signed out");
    Ok(())
}
