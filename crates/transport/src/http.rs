//! reqwest-backed transport
//!
//! Sends each `ApiRequest` to `base_url + path` with a per-request timeout.
//! The client keeps a cookie store so the backend's HttpOnly refresh cookie,
//! set by login and rotated by every refresh, is replayed automatically.
//! Configured static headers are injected on every call, except that an
//! injection can never overwrite `Authorization`.

use crate::{ApiRequest, RawResponse, Result, Transport, TransportError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Header injection rule (name + value pair from config).
#[derive(Debug, Clone)]
pub struct HeaderInjection {
    pub name: String,
    pub value: String,
}

/// Settings for `HttpTransport`.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub headers: Vec<HeaderInjection>,
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    headers: Vec<HeaderInjection>,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("building HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Use an existing reqwest client (its cookie policy is left as-is).
    pub fn with_client(client: reqwest::Client, config: HttpTransportConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            headers: config.headers,
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Apply configured injections; `Authorization` is owned by the
    /// authenticated client and is never overwritten.
    fn inject_headers(&self, headers: &mut HeaderMap) {
        for injection in &self.headers {
            let name = match HeaderName::from_str(&injection.name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            if name == reqwest::header::AUTHORIZATION {
                warn!(header = %injection.name, "refusing to overwrite authorization header");
                continue;
            }
            let value = match HeaderValue::from_str(&injection.value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            headers.insert(name, value);
        }
    }

    async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
        let ApiRequest {
            method,
            path,
            mut headers,
            body,
        } = request;
        self.inject_headers(&mut headers);

        let url = self.url_for(&path);
        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(headers)
            .timeout(self.timeout);
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(format!("{method} {path}: {e}"))
            } else if e.is_builder() {
                TransportError::InvalidRequest(format!("{method} {path}: {e}"))
            } else {
                TransportError::Connect(format!("{method} {path}: {e}"))
            }
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(format!("{method} {path}: reading body: {e}"))
            } else {
                TransportError::Body(format!("{method} {path}: {e}"))
            }
        })?;

        debug!(%method, %path, status, bytes = body.len(), "response received");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + '_>> {
        Box::pin(self.execute(request))
    }
}
