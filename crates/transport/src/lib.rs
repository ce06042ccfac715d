//! Outbound call abstraction for the MagicStream REST backend
//!
//! Defines the `Transport` trait that performs exactly one outbound call and
//! returns the raw outcome. Transport carries no retry logic and no knowledge
//! of credentials beyond the headers it is handed; classifying a response as
//! an expiry signal is the authenticated client's job.

pub mod http;

pub use http::{HeaderInjection, HttpTransport, HttpTransportConfig};

use bytes::Bytes;
use cookie::Cookie;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;

/// How a response status is interpreted by the layers above Transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx
    Success,
    /// The presented access credential is no longer valid (401)
    ExpirySignal,
    /// The refresh evidence was refused (401/403 from the refresh endpoint)
    Rejected,
    /// Any other status, surfaced to the caller unchanged
    Other,
}

impl ResponseClass {
    /// Classify a response from an ordinary API endpoint.
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => ResponseClass::Success,
            401 => ResponseClass::ExpirySignal,
            _ => ResponseClass::Other,
        }
    }

    /// Classify a response from the refresh endpoint.
    ///
    /// 401/403 there means the refresh evidence is revoked or expired.
    pub fn of_refresh(status: u16) -> Self {
        match status {
            200..=299 => ResponseClass::Success,
            401 | 403 => ResponseClass::Rejected,
            _ => ResponseClass::Other,
        }
    }
}

/// Errors produced before any HTTP status was received.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// A single outbound call: method, path relative to the API base URL,
/// headers and an optional JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace the Authorization header with `Bearer <token>`.
    ///
    /// The header value is marked sensitive so it never shows up in
    /// reqwest's debug output.
    pub fn set_bearer(&mut self, token: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| TransportError::InvalidRequest(format!("invalid bearer token: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// The bearer token currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/// A response exactly as the server sent it.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Value of the named cookie from the response's `Set-Cookie` headers,
    /// with surrounding double quotes removed.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| Cookie::parse(v).ok())
            .find(|c| c.name() == name)
            .map(|c| c.value_trimmed().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Performs a single outbound call.
///
/// Any HTTP response, whatever its status, is returned as `Ok`; only failures
/// that produced no response at all are errors. Uses `Pin<Box<dyn Future>>`
/// so the client can hold an `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_endpoint_classification() {
        assert_eq!(ResponseClass::of(200), ResponseClass::Success);
        assert_eq!(ResponseClass::of(201), ResponseClass::Success);
        assert_eq!(ResponseClass::of(401), ResponseClass::ExpirySignal);
        assert_eq!(ResponseClass::of(403), ResponseClass::Other);
        assert_eq!(ResponseClass::of(404), ResponseClass::Other);
        assert_eq!(ResponseClass::of(500), ResponseClass::Other);
    }

    #[test]
    fn refresh_endpoint_classification() {
        assert_eq!(ResponseClass::of_refresh(200), ResponseClass::Success);
        assert_eq!(ResponseClass::of_refresh(401), ResponseClass::Rejected);
        assert_eq!(ResponseClass::of_refresh(403), ResponseClass::Rejected);
        assert_eq!(ResponseClass::of_refresh(500), ResponseClass::Other);
        assert_eq!(ResponseClass::of_refresh(502), ResponseClass::Other);
    }

    #[test]
    fn set_bearer_replaces_existing_authorization() {
        let mut request = ApiRequest::get("/movies")
            .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        request.set_bearer("T1").unwrap();
        assert_eq!(request.bearer(), Some("T1"));
        assert_eq!(request.headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert!(request.headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn set_bearer_rejects_control_characters() {
        let mut request = ApiRequest::get("/movies");
        let err = request.set_bearer("bad\ntoken").unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)), "got: {err:?}");
        assert!(request.bearer().is_none());
    }

    #[test]
    fn bearer_absent_without_header() {
        assert_eq!(ApiRequest::post("/login").bearer(), None);
    }

    #[test]
    fn success_range() {
        assert!(RawResponse::new(200, "").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(401, "").is_success());
        assert!(!RawResponse::new(500, "").is_success());
    }

    #[test]
    fn cookie_reads_named_set_cookie() {
        let mut response = RawResponse::new(200, r#"{"message":"Tokens refreshed"}"#);
        response.headers.append(
            SET_COOKIE,
            HeaderValue::from_static("refresh_token=r2; Path=/; Max-Age=604800; HttpOnly"),
        );
        response.headers.append(
            SET_COOKIE,
            HeaderValue::from_static("access_token=a2; Path=/; Max-Age=86400; HttpOnly"),
        );
        assert_eq!(response.cookie("access_token").as_deref(), Some("a2"));
        assert_eq!(response.cookie("refresh_token").as_deref(), Some("r2"));
        assert_eq!(response.cookie("session"), None);
    }

    #[test]
    fn quoted_cookie_value_is_unquoted() {
        let mut response = RawResponse::new(200, "");
        response.headers.append(
            SET_COOKIE,
            HeaderValue::from_static(r#"access_token="a3"; Path=/; HttpOnly"#),
        );
        response.headers.append(SET_COOKIE, HeaderValue::from_static("not a cookie"));
        assert_eq!(response.cookie("access_token").as_deref(), Some("a3"));
    }

    #[test]
    fn cleared_cookie_reads_as_absent() {
        let mut response = RawResponse::new(200, "");
        response.headers.append(
            SET_COOKIE,
            HeaderValue::from_static("access_token=; Path=/; Max-Age=0"),
        );
        assert_eq!(response.cookie("access_token"), None);
    }

    #[test]
    fn json_body_parses() {
        let response = RawResponse::new(200, r#"{"imdb_id":"tt0111161"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["imdb_id"], "tt0111161");
        assert_eq!(response.text(), r#"{"imdb_id":"tt0111161"}"#);
    }
}
