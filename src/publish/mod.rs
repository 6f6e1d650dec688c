//! Two-phase media publishing
//!
//! Every item goes through the same three stages: a media container is
//! created ([`submit`]), the poller waits for the platform to finish
//! processing it ([`poll`]), and the attempter publishes it, retrying while
//! the platform still reports the media as not ready ([`attempt`]).
//! [`pipeline`] runs the stages for a batch of items.

pub mod attempt;
pub mod error;
pub mod item;
pub mod pipeline;
pub mod poll;
pub mod resources;
pub mod submit;
pub mod tags;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::graph::endpoint;

pub use attempt::{is_not_ready, publish_container};
pub use error::{BatchError, ErrorKind, ItemError, PublishError};
pub use item::{AdditionalFields, ProductTagInput, PublishItem, UserTagInput};
pub use pipeline::{FailureMode, ItemOutput, PipelineSettings, PublishPipeline};
pub use poll::{wait_until_ready, ContainerStatus, StatusSnapshot};
pub use resources::{MediaKind, ResourceDescriptor, ResourceRegistry, Timing, TimingOverride};
pub use submit::{submit_container, MediaContainer};

/// Where one item's requests go: host, API version and target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphTarget {
    pub host: String,
    pub api_version: String,
    pub node: String,
}

impl GraphTarget {
    pub fn new(
        host: impl Into<String>,
        api_version: impl Into<String>,
        node: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            api_version: api_version.into(),
            node: node.into(),
        }
    }

    /// `{host}/{api_version}/{segments...}`
    pub fn url(&self, segments: &[&str]) -> String {
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push(self.api_version.as_str());
        all.extend_from_slice(segments);
        endpoint(&self.host, &all)
    }
}

/// Sleep for `duration` unless the run is cancelled first.
pub(crate) async fn pause(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), PublishError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PublishError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url() {
        let target = GraphTarget::new("https://graph.facebook.com/", "v22.0", "1784");
        assert_eq!(
            target.url(&[target.node.as_str(), "media_publish"]),
            "https://graph.facebook.com/v22.0/1784/media_publish"
        );
        assert_eq!(target.url(&["555"]), "https://graph.facebook.com/v22.0/555");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps_full_duration() {
        let started = tokio::time::Instant::now();
        pause(Duration::from_millis(1500), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_is_cancellable() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let result = pause(Duration::from_secs(60), &cancel).await;
        assert!(matches!(result, Err(PublishError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(60));
    }
}
