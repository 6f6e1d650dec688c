//! Media container creation.

use serde_json::Value;

use super::error::PublishError;
use super::item::{AdditionalFields, PublishItem};
use super::resources::{MediaKind, PayloadFields, ResourceDescriptor};
use super::tags::{serialize_product_tags, serialize_user_tags};
use super::GraphTarget;
use crate::graph::{GraphBody, GraphRequest, GraphTransport};

/// A created, not yet published, media container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaContainer {
    pub creation_id: String,
    pub kind: MediaKind,
}

/// Validated optional creation parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaOptions {
    pub alt_text: Option<String>,
    pub location_id: Option<String>,
    /// JSON-encoded user tag list
    pub user_tags: Option<String>,
    /// JSON-encoded product tag list
    pub product_tags: Option<String>,
}

impl MediaOptions {
    pub fn from_fields(fields: &AdditionalFields) -> Result<Self, PublishError> {
        Ok(Self {
            alt_text: fields
                .alt_text
                .as_ref()
                .filter(|text| !text.trim().is_empty())
                .cloned(),
            location_id: fields
                .location_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            user_tags: serialize_user_tags(&fields.user_tags)?,
            product_tags: serialize_product_tags(&fields.product_tags)?,
        })
    }
}

/// Build `POST {host}/{version}/{node}/media`.
pub fn creation_request(
    target: &GraphTarget,
    caption: &str,
    payload: &PayloadFields,
    options: &MediaOptions,
) -> GraphRequest {
    let mut request = GraphRequest::post(target.url(&[target.node.as_str(), "media"]))
        .with_query("caption", caption);
    for (key, value) in payload.iter() {
        request = request.with_query(key, value);
    }
    let optional = [
        ("alt_text", &options.alt_text),
        ("location_id", &options.location_id),
        ("user_tags", &options.user_tags),
        ("product_tags", &options.product_tags),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            request = request.with_query(key, value.as_str());
        }
    }
    request
}

/// Create the media container for `item`.
pub async fn submit_container(
    transport: &dyn GraphTransport,
    target: &GraphTarget,
    descriptor: &ResourceDescriptor,
    item: &PublishItem,
) -> Result<MediaContainer, PublishError> {
    let payload = descriptor.build_payload(item)?;
    let options = MediaOptions::from_fields(&item.additional_fields)?;
    let request = creation_request(target, &item.caption, &payload, &options);

    tracing::debug!(
        resource = %descriptor.kind,
        node = %target.node,
        params = request.query.len(),
        "creating media container"
    );

    let body = transport
        .execute(request)
        .await
        .map_err(|source| PublishError::Transport {
            source,
            creation_id: None,
        })?;

    let response = match body {
        GraphBody::Json(value @ Value::Object(_)) => value,
        GraphBody::Json(other) => {
            return Err(PublishError::MalformedResponse {
                body: other.to_string(),
            })
        }
        GraphBody::Text(text) => return Err(PublishError::MalformedResponse { body: text }),
    };

    let creation_id = match response.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(PublishError::MissingCreationId { response }),
    };

    tracing::info!(
        resource = %descriptor.kind,
        creation_id = %creation_id,
        "media container created"
    );

    Ok(MediaContainer {
        creation_id,
        kind: descriptor.kind,
    })
}
