//! Publishing a processed container.
//!
//! The status endpoint can report a container as finished while the publish
//! endpoint still refuses it. Publishing therefore retries on the errors the
//! platform uses for "media not ready" and stops on anything else.

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::PublishError;
use super::resources::Timing;
use super::{pause, GraphTarget};
use crate::graph::{GraphError, GraphRequest, GraphTransport};
use crate::logging::redact::Redacted;

/// Message fragments meaning the media is not ready yet
pub const NOT_READY_PHRASES: &[&str] = &["not ready", "not finished", "not yet"];

/// Platform error code for media that is still being processed
pub const NOT_READY_CODE: i64 = 900;

/// Platform error subcode for media that is not ready to publish
pub const NOT_READY_SUBCODE: i64 = 2207055;

/// Whether `err` means "try again later" rather than a terminal failure.
pub fn is_not_ready(err: &GraphError) -> bool {
    let Some(platform) = err.platform_error() else {
        return false;
    };
    if platform.code() == Some(NOT_READY_CODE) || platform.subcode() == Some(NOT_READY_SUBCODE) {
        return true;
    }
    platform
        .message()
        .map(|message| {
            let message = message.to_lowercase();
            NOT_READY_PHRASES.iter().any(|p| message.contains(p))
        })
        .unwrap_or(false)
}

/// Build `POST {host}/{version}/{node}/media_publish?creation_id=...`.
pub fn publish_request(target: &GraphTarget, creation_id: &str) -> GraphRequest {
    GraphRequest::post(target.url(&[target.node.as_str(), "media_publish"]))
        .with_query("creation_id", creation_id)
}

/// Publish a container, retrying while the platform reports it not ready.
///
/// Returns the platform's response body. Raw text bodies are returned as a
/// JSON string.
pub async fn publish_container(
    transport: &dyn GraphTransport,
    target: &GraphTarget,
    creation_id: &str,
    timing: &Timing,
    cancel: &CancellationToken,
) -> Result<Value, PublishError> {
    let max_attempts = timing.publish_max_attempts.get();
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match transport.execute(publish_request(target, creation_id)).await {
            Ok(body) => {
                tracing::info!(
                    creation_id = %creation_id,
                    node = %target.node,
                    attempt,
                    "media published"
                );
                return Ok(body.into_value());
            }
            Err(err) if is_not_ready(&err) => {
                tracing::warn!(
                    creation_id = %creation_id,
                    attempt,
                    max_attempts,
                    error = %Redacted(&err.message()),
                    "media not ready to publish"
                );
                last_error = Some(err);
                if attempt < max_attempts {
                    pause(timing.publish_retry_delay(), cancel).await?;
                }
            }
            Err(err) => {
                tracing::warn!(
                    creation_id = %creation_id,
                    attempt,
                    error = %Redacted(&err.message()),
                    "publish failed"
                );
                return Err(PublishError::PublishFailedAfterCreation {
                    creation_id: creation_id.to_string(),
                    attempt,
                    source: err,
                });
            }
        }
    }

    tracing::warn!(
        creation_id = %creation_id,
        attempts = max_attempts,
        "publish retries exhausted"
    );
    Err(PublishError::PublishRetriesExhausted {
        creation_id: creation_id.to_string(),
        attempts: max_attempts,
        last_error,
    })
}
