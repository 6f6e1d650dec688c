//! Batch orchestration.
//!
//! Items are processed strictly in order, each one running submit, poll and
//! publish to completion before the next begins. Every item yields exactly
//! one output tagged with its input index.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::attempt::publish_container;
use super::error::{BatchError, PublishError};
use super::item::{PublishItem, PUBLISH_OPERATION};
use super::poll::wait_until_ready;
use super::resources::ResourceRegistry;
use super::submit::submit_container;
use super::GraphTarget;
use crate::graph::{GraphTransport, DEFAULT_API_VERSION, DEFAULT_GRAPH_HOST};
use crate::logging::redact::Redacted;

/// What happens when an item fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// The first failure aborts the batch
    #[default]
    FailFast,
    /// Failures become structured outputs and the batch continues
    ContinueOnFail,
}

impl FailureMode {
    pub fn from_continue_flag(continue_on_fail: bool) -> Self {
        if continue_on_fail {
            FailureMode::ContinueOnFail
        } else {
            FailureMode::FailFast
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub host: String,
    /// Used for items that do not carry their own version
    pub default_api_version: String,
    pub failure_mode: FailureMode,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_GRAPH_HOST.to_string(),
            default_api_version: DEFAULT_API_VERSION.to_string(),
            failure_mode: FailureMode::default(),
        }
    }
}

/// One result, correlated with the item it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutput {
    pub json: Value,
    pub item_index: usize,
}

pub struct PublishPipeline {
    transport: Arc<dyn GraphTransport>,
    registry: Arc<ResourceRegistry>,
    settings: PipelineSettings,
}

impl PublishPipeline {
    pub fn new(
        transport: Arc<dyn GraphTransport>,
        registry: Arc<ResourceRegistry>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            transport,
            registry,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Publish every item in order.
    ///
    /// Cancellation aborts the batch regardless of the failure mode.
    pub async fn run(
        &self,
        items: &[PublishItem],
        cancel: &CancellationToken,
    ) -> Result<Vec<ItemOutput>, BatchError> {
        let inputs = items.iter().cloned().map(Ok).collect();
        self.run_inputs(inputs, cancel).await
    }

    /// Publish a batch whose items were converted one by one.
    ///
    /// An `Err` input counts as that item's failure and is handled by the
    /// failure mode like any other per-item error.
    pub async fn run_inputs(
        &self,
        inputs: Vec<Result<PublishItem, PublishError>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ItemOutput>, BatchError> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("publish_run", run_id = %run_id, items = inputs.len());

        async {
            let mut outputs = Vec::with_capacity(inputs.len());
            let mut failed = 0usize;

            for (item_index, input) in inputs.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    return Err(BatchError {
                        item_index,
                        source: PublishError::Cancelled,
                    });
                }

                let result = match input {
                    Ok(item) => {
                        let item_span = tracing::info_span!(
                            "publish_item",
                            item_index,
                            resource = %item.resource
                        );
                        self.process_item(&item, cancel).instrument(item_span).await
                    }
                    Err(err) => Err(err),
                };

                match result {
                    Ok(json) => outputs.push(ItemOutput { json, item_index }),
                    Err(source @ PublishError::Cancelled) => {
                        tracing::warn!(item_index, "publish run cancelled");
                        return Err(BatchError { item_index, source });
                    }
                    Err(source) => match self.settings.failure_mode {
                        FailureMode::FailFast => {
                            tracing::error!(
                                item_index,
                                kind = ?source.kind(),
                                error = %Redacted(&source.to_string()),
                                "item failed, aborting batch"
                            );
                            return Err(BatchError { item_index, source });
                        }
                        FailureMode::ContinueOnFail => {
                            tracing::warn!(
                                item_index,
                                kind = ?source.kind(),
                                error = %Redacted(&source.to_string()),
                                "item failed, continuing"
                            );
                            failed += 1;
                            outputs.push(ItemOutput {
                                json: source.into_item_error().to_value(),
                                item_index,
                            });
                        }
                    },
                }
            }

            tracing::info!(
                published = outputs.len() - failed,
                failed,
                "publish run finished"
            );
            Ok(outputs)
        }
        .instrument(span)
        .await
    }

    /// Run all three stages for one item and return the publish response.
    pub async fn process_item(
        &self,
        item: &PublishItem,
        cancel: &CancellationToken,
    ) -> Result<Value, PublishError> {
        let descriptor = self
            .registry
            .lookup(&item.resource)
            .ok_or_else(|| PublishError::UnsupportedResource(item.resource.clone()))?;

        if item.operation != PUBLISH_OPERATION {
            return Err(PublishError::UnsupportedOperation {
                resource: item.resource.clone(),
                operation: item.operation.clone(),
            });
        }

        let node = item.node.trim();
        if node.is_empty() {
            return Err(PublishError::invalid("node", "required field is missing or empty"));
        }

        let api_version = item
            .graph_api_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(self.settings.default_api_version.as_str());
        let target = GraphTarget::new(self.settings.host.as_str(), api_version, node);
        let transport = self.transport.as_ref();

        let container = submit_container(transport, &target, descriptor, item).await?;
        wait_until_ready(
            transport,
            &target,
            &container.creation_id,
            &descriptor.timing,
            cancel,
        )
        .await?;
        publish_container(
            transport,
            &target,
            &container.creation_id,
            &descriptor.timing,
            cancel,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testing::ScriptedTransport;
    use crate::graph::GraphError;
    use crate::publish::error::PUBLISH_AFTER_CREATION_NOTE;
    use crate::publish::resources::Timing;
    use serde_json::json;
    use std::num::{NonZeroU32, NonZeroU64};

    fn fast_registry() -> Arc<ResourceRegistry> {
        Arc::new(ResourceRegistry::with_uniform_timing(Timing::new(
            NonZeroU64::new(10).unwrap(),
            NonZeroU32::new(3).unwrap(),
            NonZeroU64::new(10).unwrap(),
            NonZeroU32::new(2).unwrap(),
        )))
    }

    fn pipeline(transport: Arc<ScriptedTransport>, failure_mode: FailureMode) -> PublishPipeline {
        PublishPipeline::new(
            transport,
            fast_registry(),
            PipelineSettings {
                host: "https://graph.example.com".to_string(),
                failure_mode,
                ..PipelineSettings::default()
            },
        )
    }

    fn image_item() -> PublishItem {
        PublishItem::new("image", "1784")
            .with_caption("hello")
            .with_field("imageUrl", "https://cdn.example.com/a.jpg")
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_single_item() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(json!({"id": "123"}))
            .push_json(json!({"status_code": "IN_PROGRESS"}))
            .push_json(json!({"status_code": "FINISHED"}))
            .push_json(json!({"id": "999"}));

        let outputs = pipeline(transport.clone(), FailureMode::FailFast)
            .run(&[image_item()], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outputs,
            vec![ItemOutput {
                json: json!({"id": "999"}),
                item_index: 0
            }]
        );
        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://graph.example.com/v22.0/1784/media",
                "https://graph.example.com/v22.0/123",
                "https://graph.example.com/v22.0/123",
                "https://graph.example.com/v22.0/1784/media_publish",
            ]
        );
    }

    #[tokio::test]
    async fn test_item_api_version_overrides_default() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(json!({"id": "1"}))
            .push_json(json!({"status_code": "FINISHED"}))
            .push_json(json!({"id": "2"}));

        let mut item = image_item();
        item.graph_api_version = Some("v19.0".to_string());
        pipeline(transport.clone(), FailureMode::FailFast)
            .run(&[item], &CancellationToken::new())
            .await
            .unwrap();

        assert!(transport
            .requests()
            .iter()
            .all(|r| r.url.starts_with("https://graph.example.com/v19.0/")));
    }

    #[tokio::test]
    async fn test_unsupported_resource_continues() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(json!({"id": "1"}))
            .push_json(json!({"status_code": "FINISHED"}))
            .push_json(json!({"id": "2"}));

        let items = vec![PublishItem::new("comments", "1784"), image_item()];
        let outputs = pipeline(transport.clone(), FailureMode::ContinueOnFail)
            .run(&items, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].item_index, 0);
        assert_eq!(outputs[0].json["kind"], "unsupported_resource");
        assert_eq!(outputs[1].item_index, 1);
        assert_eq!(outputs[1].json, json!({"id": "2"}));
    }

    #[tokio::test]
    async fn test_unsupported_operation_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut item = image_item();
        item.operation = "delete".to_string();

        let outputs = pipeline(transport.clone(), FailureMode::ContinueOnFail)
            .run(&[item], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outputs[0].json["kind"], "unsupported_operation");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_batch() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(json!({"success": true}));

        let items = vec![image_item(), image_item()];
        let err = pipeline(transport.clone(), FailureMode::FailFast)
            .run(&items, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.item_index, 0);
        assert!(matches!(err.source, PublishError::MissingCreationId { .. }));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_node_is_invalid() {
        let transport = Arc::new(ScriptedTransport::new());
        let item =
            PublishItem::new("image", "  ").with_field("imageUrl", "https://cdn.example.com/a.jpg");

        let outputs = pipeline(transport.clone(), FailureMode::ContinueOnFail)
            .run(&[item], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outputs[0].json["kind"], "invalid_parameter");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failure_carries_creation_id() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(json!({"id": "123"}))
            .push_json(json!({"status_code": "FINISHED"}))
            .push_error(GraphError::api(
                403,
                &json!({"error": {"message": "Permissions error", "code": 10}}),
            ));

        let outputs = pipeline(transport, FailureMode::ContinueOnFail)
            .run(&[image_item()], &CancellationToken::new())
            .await
            .unwrap();

        let json = &outputs[0].json;
        assert_eq!(json["kind"], "publish_failed_after_creation");
        assert_eq!(json["creationId"], "123");
        assert_eq!(json["note"], PUBLISH_AFTER_CREATION_NOTE);
        assert_eq!(json["statusCode"], 403);
        assert_eq!(json["details"]["code"], 10);
    }

    #[tokio::test]
    async fn test_cancelled_run_aborts_even_in_continue_mode() {
        let transport = Arc::new(ScriptedTransport::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline(transport.clone(), FailureMode::ContinueOnFail)
            .run(&[image_item()], &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.item_index, 0);
        assert!(matches!(err.source, PublishError::Cancelled));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_item_is_isolated_in_continue_mode() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(json!({"id": "1"}))
            .push_json(json!({"status_code": "FINISHED"}))
            .push_json(json!({"id": "2"}));

        let inputs = vec![
            Ok(image_item()),
            PublishItem::from_value(json!({
                "node": "1784",
                "imageUrl": "https://cdn.example.com/b.jpg"
            })),
            PublishItem::from_value(json!({
                "resource": "image",
                "node": "1784",
                "additionalFields": {"userTags": [{"username": "alice", "x": "0.5"}]}
            })),
        ];
        let outputs = pipeline(transport.clone(), FailureMode::ContinueOnFail)
            .run_inputs(inputs, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].json, json!({"id": "2"}));
        assert_eq!(outputs[1].item_index, 1);
        assert_eq!(outputs[1].json["kind"], "invalid_parameter");
        assert_eq!(outputs[2].item_index, 2);
        assert_eq!(outputs[2].json["kind"], "invalid_parameter");
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_item_aborts_in_fail_fast_mode() {
        let transport = Arc::new(ScriptedTransport::new());
        let inputs = vec![
            PublishItem::from_value(json!({"node": "1784"})),
            Ok(image_item()),
        ];

        let err = pipeline(transport.clone(), FailureMode::FailFast)
            .run_inputs(inputs, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.item_index, 0);
        assert!(matches!(err.source, PublishError::InvalidParameter { .. }));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let transport = Arc::new(ScriptedTransport::new());
        let outputs = pipeline(transport, FailureMode::FailFast)
            .run(&[], &CancellationToken::new())
            .await
            .unwrap();
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_item_output_serializes_camel_case() {
        let output = ItemOutput {
            json: json!({"id": "999"}),
            item_index: 0,
        };
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"json": {"id": "999"}, "itemIndex": 0})
        );
    }
}
