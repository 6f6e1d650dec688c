//! Graph API transport
//!
//! The publish pipeline talks to the platform exclusively through the
//! [`GraphTransport`] trait. The production implementation is
//! [`HttpGraphClient`], which attaches credentials; tests script responses
//! through in-memory implementations.

pub mod http;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use http::{HttpClientConfig, HttpGraphClient};

/// Default Graph API host.
pub const DEFAULT_GRAPH_HOST: &str = "https://graph.facebook.com";

/// Default Graph API version used when an item does not carry one.
pub const DEFAULT_API_VERSION: &str = "v22.0";

/// HTTP method of a Graph request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphMethod {
    Get,
    Post,
}

impl fmt::Display for GraphMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphMethod::Get => write!(f, "GET"),
            GraphMethod::Post => write!(f, "POST"),
        }
    }
}

/// A single outbound Graph request.
///
/// All parameters travel as query parameters, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRequest {
    pub method: GraphMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl GraphRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: GraphMethod::Get,
            url: url.into(),
            query: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: GraphMethod::Post,
            url: url.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Look up a query parameter by name
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Build `{host}/{segments...}` without doubling slashes.
pub fn endpoint(host: &str, segments: &[&str]) -> String {
    let mut url = host.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(segment.trim_matches('/'));
    }
    url
}

/// Body of a successful Graph response
#[derive(Debug, Clone, PartialEq)]
pub enum GraphBody {
    /// The body parsed as JSON
    Json(Value),
    /// The body could not be parsed as JSON
    Text(String),
}

impl GraphBody {
    /// Convert into a JSON value, wrapping raw text as a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            GraphBody::Json(value) => value,
            GraphBody::Text(text) => Value::String(text),
        }
    }
}

/// Error payload returned by the platform (`{"error": {...}}`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformError {
    /// Every field of the platform error object, verbatim
    pub fields: Map<String, Value>,
}

impl PlatformError {
    /// Extract the platform error object from a response body.
    ///
    /// Bodies without an `error` object keep their top-level fields; non-object
    /// bodies become `{"message": <text>}`.
    pub fn from_body(body: &Value) -> Self {
        let fields = match body {
            Value::Object(map) => match map.get("error") {
                Some(Value::Object(inner)) => inner.clone(),
                Some(Value::String(message)) => {
                    let mut fields = Map::new();
                    fields.insert("message".to_string(), Value::String(message.clone()));
                    fields
                }
                _ => map.clone(),
            },
            Value::Null => Map::new(),
            Value::String(text) => {
                let mut fields = Map::new();
                fields.insert("message".to_string(), Value::String(text.clone()));
                fields
            }
            other => {
                let mut fields = Map::new();
                fields.insert("message".to_string(), Value::String(other.to_string()));
                fields
            }
        };
        Self { fields }
    }

    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").and_then(Value::as_str)
    }

    pub fn code(&self) -> Option<i64> {
        self.fields.get("code").and_then(as_integer)
    }

    pub fn subcode(&self) -> Option<i64> {
        self.fields.get("error_subcode").and_then(as_integer)
    }

    /// User-facing message, when the platform supplies one
    pub fn user_message(&self) -> Option<&str> {
        self.fields.get("error_user_msg").and_then(Value::as_str)
    }
}

// The platform occasionally sends numeric codes as strings.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Errors raised by a [`GraphTransport`]
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    /// The request never produced an HTTP response
    #[error("Graph request failed: {0}")]
    Network(String),

    /// The platform answered with a non-success status
    #[error("Graph API error (status {status}): {}", .error.message().unwrap_or("unknown error"))]
    Api {
        status: u16,
        error: PlatformError,
        headers: BTreeMap<String, String>,
    },
}

impl GraphError {
    /// Construct an API error from a status code and raw body
    pub fn api(status: u16, body: &Value) -> Self {
        GraphError::Api {
            status,
            error: PlatformError::from_body(body),
            headers: BTreeMap::new(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            GraphError::Network(_) => None,
            GraphError::Api { status, .. } => Some(*status),
        }
    }

    pub fn platform_error(&self) -> Option<&PlatformError> {
        match self {
            GraphError::Network(_) => None,
            GraphError::Api { error, .. } => Some(error),
        }
    }

    pub fn headers(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            GraphError::Network(_) => None,
            GraphError::Api { headers, .. } => Some(headers),
        }
    }

    /// The most specific human-readable message available
    pub fn message(&self) -> String {
        match self {
            GraphError::Network(message) => message.clone(),
            GraphError::Api { error, status, .. } => error
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("request failed with status {}", status)),
        }
    }
}

/// Authenticated access to the Graph API.
///
/// Implementations are responsible for attaching credentials; callers only
/// describe the request.
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Execute one request and return the response body.
    async fn execute(&self, request: GraphRequest) -> Result<GraphBody, GraphError>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_joins_segments() {
        assert_eq!(
            endpoint("https://graph.facebook.com/", &["v22.0", "123", "media"]),
            "https://graph.facebook.com/v22.0/123/media"
        );
        assert_eq!(endpoint("http://localhost:8080", &["v1"]), "http://localhost:8080/v1");
    }

    #[test]
    fn test_platform_error_from_nested_body() {
        let body = json!({
            "error": {
                "message": "Media ID is not available",
                "type": "OAuthException",
                "code": 9007,
                "error_subcode": 2207027
            }
        });
        let err = PlatformError::from_body(&body);
        assert_eq!(err.message(), Some("Media ID is not available"));
        assert_eq!(err.code(), Some(9007));
        assert_eq!(err.subcode(), Some(2207027));
        assert_eq!(err.fields.get("type"), Some(&json!("OAuthException")));
    }

    #[test]
    fn test_platform_error_string_codes() {
        let err = PlatformError::from_body(&json!({"error": {"code": "900"}}));
        assert_eq!(err.code(), Some(900));
    }

    #[test]
    fn test_platform_error_from_text() {
        let err = PlatformError::from_body(&json!("Bad Gateway"));
        assert_eq!(err.message(), Some("Bad Gateway"));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_graph_error_accessors() {
        let err = GraphError::api(400, &json!({"error": {"message": "bad", "code": 100}}));
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.message(), "bad");
        assert!(err.to_string().contains("status 400"));

        let net = GraphError::Network("connection reset".to_string());
        assert_eq!(net.status_code(), None);
        assert!(net.platform_error().is_none());
    }

    #[test]
    fn test_request_query_lookup() {
        let req =
            GraphRequest::post("https://x/v1/1/media_publish").with_query("creation_id", "42");
        assert_eq!(req.query_value("creation_id"), Some("42"));
        assert_eq!(req.query_value("caption"), None);
        assert_eq!(req.method, GraphMethod::Post);
    }
}
