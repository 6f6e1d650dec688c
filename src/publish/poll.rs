//! Container readiness polling.
//!
//! After creation the platform processes media out-of-band. The poller reads
//! `status_code` and `status` until one of them reports a terminal state or
//! the attempt budget runs out.

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::PublishError;
use super::resources::Timing;
use super::{pause, GraphTarget};
use crate::graph::{GraphRequest, GraphTransport};

/// Tokens meaning processing finished successfully
pub const READY_TOKENS: &[&str] = &["FINISHED", "PUBLISHED", "READY"];

/// Tokens meaning processing failed
pub const ERROR_TOKENS: &[&str] = &["ERROR", "FAILED"];

/// Fields requested from the status endpoint
pub const STATUS_FIELDS: &str = "status_code,status";

/// Classified container state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    Pending,
    Ready,
    Error,
}

/// Normalize a raw status value to its leading token.
///
/// `"Finished: Media has been uploaded"` becomes `FINISHED` and
/// `"In Progress"` becomes `IN_PROGRESS`.
pub fn status_token(raw: &str) -> String {
    let label = raw.split(':').next().unwrap_or_default();
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_uppercase()
}

/// Classify a single raw status value
pub fn classify_token(raw: &str) -> ContainerStatus {
    let token = status_token(raw);
    if ERROR_TOKENS.contains(&token.as_str()) {
        ContainerStatus::Error
    } else if READY_TOKENS.contains(&token.as_str()) {
        ContainerStatus::Ready
    } else {
        ContainerStatus::Pending
    }
}

/// Status-bearing fields of one status response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status_code: Option<String>,
    pub status: Option<String>,
}

impl StatusSnapshot {
    pub fn from_response(response: &Value) -> Self {
        let field = |name: &str| {
            response
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            status_code: field("status_code"),
            status: field("status"),
        }
    }

    fn present(&self) -> impl Iterator<Item = &str> {
        [self.status_code.as_deref(), self.status.as_deref()]
            .into_iter()
            .flatten()
    }

    /// ERROR on any field wins over READY on any other field.
    pub fn classify(&self) -> ContainerStatus {
        let verdicts: Vec<ContainerStatus> = self.present().map(classify_token).collect();
        if verdicts.contains(&ContainerStatus::Error) {
            ContainerStatus::Error
        } else if verdicts.contains(&ContainerStatus::Ready) {
            ContainerStatus::Ready
        } else {
            ContainerStatus::Pending
        }
    }

    /// Present raw values joined for diagnostics
    pub fn joined(&self) -> String {
        self.present().collect::<Vec<_>>().join(" | ")
    }

    /// The value reported when polling times out
    pub fn last_token(&self) -> Option<String> {
        self.status_code.clone().or_else(|| self.status.clone())
    }
}

/// Build `GET {host}/{version}/{creation_id}?fields=status_code,status`.
pub fn status_request(target: &GraphTarget, creation_id: &str) -> GraphRequest {
    GraphRequest::get(target.url(&[creation_id])).with_query("fields", STATUS_FIELDS)
}

/// Poll until the container is ready.
///
/// Issues at most `timing.max_poll_attempts` requests and sleeps
/// `timing.poll_interval` between them.
pub async fn wait_until_ready(
    transport: &dyn GraphTransport,
    target: &GraphTarget,
    creation_id: &str,
    timing: &Timing,
    cancel: &CancellationToken,
) -> Result<StatusSnapshot, PublishError> {
    let max_attempts = timing.max_poll_attempts.get();
    let mut last = StatusSnapshot::default();

    for attempt in 1..=max_attempts {
        let body = transport
            .execute(status_request(target, creation_id))
            .await
            .map_err(|source| PublishError::Transport {
                source,
                creation_id: Some(creation_id.to_string()),
            })?;

        let snapshot = StatusSnapshot::from_response(&body.into_value());
        match snapshot.classify() {
            ContainerStatus::Ready => {
                tracing::info!(
                    creation_id = %creation_id,
                    attempt,
                    status = %snapshot.joined(),
                    "media container ready"
                );
                return Ok(snapshot);
            }
            ContainerStatus::Error => {
                tracing::warn!(
                    creation_id = %creation_id,
                    attempt,
                    status = %snapshot.joined(),
                    "media container processing failed"
                );
                return Err(PublishError::ContainerError {
                    creation_id: creation_id.to_string(),
                    status: snapshot.joined(),
                });
            }
            ContainerStatus::Pending => {
                tracing::debug!(
                    creation_id = %creation_id,
                    attempt,
                    max_attempts,
                    status = ?snapshot.last_token(),
                    "media container still processing"
                );
            }
        }

        last = snapshot;
        if attempt < max_attempts {
            pause(timing.poll_interval(), cancel).await?;
        }
    }

    Err(PublishError::PollTimeout {
        creation_id: creation_id.to_string(),
        attempts: max_attempts,
        last_status: last.last_token(),
    })
}
