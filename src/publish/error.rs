//! Publish error kinds and the structured per-item error record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::GraphError;
use crate::logging::redact::redact_string;

/// Note attached to failures that happen after the container exists.
pub const PUBLISH_AFTER_CREATION_NOTE: &str =
    "Media container was created but publishing failed. Retry publishing with this creation_id instead of uploading the media again.";

/// Everything that can go wrong while publishing one item
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Unsupported resource: {0}")]
    UnsupportedResource(String),

    #[error("Unsupported operation '{operation}' for resource '{resource}'")]
    UnsupportedOperation { resource: String, operation: String },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("{source}")]
    Transport {
        #[source]
        source: GraphError,
        creation_id: Option<String>,
    },

    #[error("Malformed response from media creation: expected a JSON object")]
    MalformedResponse { body: String },

    #[error("No creation_id in response")]
    MissingCreationId { response: Value },

    #[error("Media container {creation_id} reported status {status}")]
    ContainerError { creation_id: String, status: String },

    #[error(
        "Media container {creation_id} was not ready after {attempts} status checks (last status: {})",
        .last_status.as_deref().unwrap_or("none")
    )]
    PollTimeout {
        creation_id: String,
        attempts: u32,
        last_status: Option<String>,
    },

    #[error("Media container {creation_id} was still not ready to publish after {attempts} attempts")]
    PublishRetriesExhausted {
        creation_id: String,
        attempts: u32,
        last_error: Option<GraphError>,
    },

    #[error("Publishing media container {creation_id} failed: {source}")]
    PublishFailedAfterCreation {
        creation_id: String,
        attempt: u32,
        #[source]
        source: GraphError,
    },

    #[error("Run cancelled")]
    Cancelled,
}

/// Machine-readable error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedResource,
    UnsupportedOperation,
    InvalidParameter,
    TransportOrApiError,
    MalformedResponse,
    MissingCreationId,
    ContainerError,
    PollTimeout,
    PublishRetriesExhausted,
    PublishFailedAfterCreation,
    Cancelled,
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::UnsupportedResource(_) => ErrorKind::UnsupportedResource,
            PublishError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            PublishError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            PublishError::Transport { .. } => ErrorKind::TransportOrApiError,
            PublishError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            PublishError::MissingCreationId { .. } => ErrorKind::MissingCreationId,
            PublishError::ContainerError { .. } => ErrorKind::ContainerError,
            PublishError::PollTimeout { .. } => ErrorKind::PollTimeout,
            PublishError::PublishRetriesExhausted { .. } => ErrorKind::PublishRetriesExhausted,
            PublishError::PublishFailedAfterCreation { .. } => {
                ErrorKind::PublishFailedAfterCreation
            }
            PublishError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        PublishError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The container this error happened after, if one was created
    pub fn creation_id(&self) -> Option<&str> {
        match self {
            PublishError::Transport { creation_id, .. } => creation_id.as_deref(),
            PublishError::ContainerError { creation_id, .. }
            | PublishError::PollTimeout { creation_id, .. }
            | PublishError::PublishRetriesExhausted { creation_id, .. }
            | PublishError::PublishFailedAfterCreation { creation_id, .. } => Some(creation_id),
            _ => None,
        }
    }

    /// Convert into the structured record appended to the batch output.
    pub fn into_item_error(self) -> ItemError {
        let mut item = ItemError::new(self.kind(), redact_string(&self.to_string()));
        item.creation_id = self.creation_id().map(str::to_string);

        match self {
            PublishError::Transport { source, .. } => {
                item.error = redact_string(&source.message());
                item.attach_graph_error(&source);
            }
            PublishError::MalformedResponse { body } => {
                item.response = Some(Value::String(redact_string(&body)));
            }
            PublishError::MissingCreationId { response } => {
                item.response = Some(response);
            }
            PublishError::ContainerError { status, .. } => {
                item.last_status = Some(status);
            }
            PublishError::PollTimeout {
                attempts,
                last_status,
                ..
            } => {
                item.attempts = Some(attempts);
                item.last_status = last_status;
            }
            PublishError::PublishRetriesExhausted {
                attempts,
                last_error,
                ..
            } => {
                item.attempts = Some(attempts);
                item.note = Some(PUBLISH_AFTER_CREATION_NOTE.to_string());
                if let Some(err) = last_error {
                    item.attach_graph_error(&err);
                }
            }
            PublishError::PublishFailedAfterCreation {
                attempt, source, ..
            } => {
                item.error = redact_string(&source.message());
                item.attempts = Some(attempt);
                item.note = Some(PUBLISH_AFTER_CREATION_NOTE.to_string());
                item.attach_graph_error(&source);
            }
            _ => {}
        }

        item
    }
}

/// Structured failure for one input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    pub kind: ErrorKind,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// The platform's error fields (`message`, `code`, `error_subcode`, ...),
    /// passed through unchanged. Absent when the failure never reached the
    /// platform or its error object was empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl ItemError {
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            error: error.into(),
            status_code: None,
            details: None,
            headers: None,
            creation_id: None,
            note: None,
            response: None,
            last_status: None,
            attempts: None,
        }
    }

    fn attach_graph_error(&mut self, err: &GraphError) {
        self.status_code = err.status_code();
        self.details = err
            .platform_error()
            .filter(|p| !p.fields.is_empty())
            .map(|p| p.fields.clone());
        self.headers = err.headers().filter(|h| !h.is_empty()).cloned();
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::String(self.error.clone()))
    }
}

/// A failure that aborted the whole batch
#[derive(Debug, thiserror::Error)]
#[error("item {item_index} failed: {source}")]
pub struct BatchError {
    pub item_index: usize,
    #[source]
    pub source: PublishError,
}
