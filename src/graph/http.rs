//! reqwest-backed Graph transport.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::{GraphBody, GraphError, GraphMethod, GraphRequest, GraphTransport, PlatformError};
use crate::credentials::AccessToken;
use crate::logging::redact::redact_string;

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Graph transport that sends real HTTP requests with a bearer token.
pub struct HttpGraphClient {
    client: reqwest::Client,
    token: AccessToken,
}

impl HttpGraphClient {
    pub fn new(token: AccessToken, config: &HttpClientConfig) -> Result<Self, GraphError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(concat!("graphpost/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GraphError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, token })
    }
}

#[async_trait]
impl GraphTransport for HttpGraphClient {
    async fn execute(&self, request: GraphRequest) -> Result<GraphBody, GraphError> {
        let method = match request.method {
            GraphMethod::Get => reqwest::Method::GET,
            GraphMethod::Post => reqwest::Method::POST,
        };

        tracing::debug!(method = %request.method, url = %request.url, "sending Graph request");

        let response = self
            .client
            .request(method, &request.url)
            .bearer_auth(self.token.expose())
            .query(&request.query)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| GraphError::Network(format!("failed to read response body: {}", e)))?;

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(value) => GraphBody::Json(value),
            Err(_) => GraphBody::Text(text),
        };

        if !status.is_success() {
            let value = body.into_value();
            return Err(GraphError::Api {
                status: status.as_u16(),
                error: PlatformError::from_body(&value),
                headers,
            });
        }

        Ok(body)
    }
}

fn map_http_error(error: reqwest::Error) -> GraphError {
    let detail = redact_string(&error.to_string());
    if error.is_timeout() {
        GraphError::Network(format!("request timeout: {}", detail))
    } else if error.is_connect() {
        GraphError::Network(format!("connection error: {}", detail))
    } else {
        GraphError::Network(detail)
    }
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
