//! Inbound item parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::PublishError;

/// The only operation the pipeline supports
pub const PUBLISH_OPERATION: &str = "publish";

fn default_operation() -> String {
    PUBLISH_OPERATION.to_string()
}

/// Parameters for one media item, as supplied by the caller.
///
/// Resource-specific fields (`imageUrl`, `videoUrl`, ...) are collected in
/// `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishItem {
    pub resource: String,
    #[serde(default = "default_operation")]
    pub operation: String,
    /// Account or page node the media is published to
    #[serde(default)]
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_api_version: Option<String>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub additional_fields: AdditionalFields,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PublishItem {
    pub fn new(resource: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            operation: default_operation(),
            node: node.into(),
            graph_api_version: None,
            caption: String::new(),
            additional_fields: AdditionalFields::default(),
            fields: Map::new(),
        }
    }

    /// Convert one raw batch element. A shape error is reported against this
    /// item only.
    pub fn from_value(value: Value) -> Result<Self, PublishError> {
        serde_json::from_value(value).map_err(|e| PublishError::invalid("item", e.to_string()))
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// A trimmed, non-empty string field. Numbers are accepted and rendered.
    pub fn string_field(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn require_string(&self, name: &str) -> Result<String, PublishError> {
        self.string_field(name)
            .ok_or_else(|| PublishError::invalid(name, "required field is missing or empty"))
    }

    /// Boolean field; `"true"`/`"false"` strings are accepted.
    pub fn bool_field(&self, name: &str) -> Result<Option<bool>, PublishError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                "" => Ok(None),
                _ => Err(PublishError::invalid(name, "expected a boolean")),
            },
            Some(_) => Err(PublishError::invalid(name, "expected a boolean")),
        }
    }

    /// Non-negative integer field.
    pub fn uint_field(&self, name: &str) -> Result<Option<u64>, PublishError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| PublishError::invalid(name, "expected a non-negative integer")),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| PublishError::invalid(name, "expected a non-negative integer")),
            Some(_) => Err(PublishError::invalid(name, "expected a non-negative integer")),
        }
    }
}

/// Optional fields shared by every media type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdditionalFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_tags: Vec<UserTagInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub product_tags: Vec<ProductTagInput>,
}

/// One user tag as entered; entries without a username are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserTagInput {
    pub username: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// One product tag as entered; entries without a product id are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductTagInput {
    /// Catalog ids arrive as either strings or numbers
    pub product_id: Option<Value>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_full_item() {
        let item: PublishItem = serde_json::from_value(json!({
            "resource": "image",
            "operation": "publish",
            "node": "17841400000000000",
            "graphApiVersion": "v21.0",
            "caption": "hello",
            "imageUrl": "https://cdn.example.com/a.jpg",
            "additionalFields": {
                "altText": "a cat",
                "userTags": [{"username": "alice", "x": 0.5, "y": 0.25}, {"x": 0.1}]
            }
        }))
        .unwrap();

        assert_eq!(item.resource, "image");
        assert_eq!(item.graph_api_version.as_deref(), Some("v21.0"));
        assert_eq!(
            item.string_field("imageUrl").as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
        assert_eq!(item.additional_fields.alt_text.as_deref(), Some("a cat"));
        assert_eq!(item.additional_fields.user_tags.len(), 2);
        assert!(item.additional_fields.user_tags[1].username.is_none());
    }

    #[test]
    fn test_from_value_reports_shape_errors_as_invalid_parameter() {
        let missing_resource = PublishItem::from_value(json!({"node": "1"})).unwrap_err();
        assert!(matches!(
            missing_resource,
            PublishError::InvalidParameter { ref name, ref reason }
                if name == "item" && reason.contains("resource")
        ));

        let bad_tag = PublishItem::from_value(json!({
            "resource": "image",
            "node": "1",
            "additionalFields": {"userTags": [{"username": "alice", "x": "0.5"}]}
        }))
        .unwrap_err();
        assert!(matches!(bad_tag, PublishError::InvalidParameter { .. }));

        let ok = PublishItem::from_value(json!({"resource": "image", "node": "1"})).unwrap();
        assert_eq!(ok.resource, "image");
    }

    #[test]
    fn test_operation_defaults_to_publish() {
        let item: PublishItem =
            serde_json::from_value(json!({"resource": "reels", "node": "1"})).unwrap();
        assert_eq!(item.operation, PUBLISH_OPERATION);
        assert!(item.fields.is_empty());
    }

    #[test]
    fn test_string_field_trims_and_rejects_blank() {
        let item = PublishItem::new("image", "1")
            .with_field("imageUrl", "   ")
            .with_field("thumbOffset", 1500);
        assert!(item.string_field("imageUrl").is_none());
        assert!(item.require_string("imageUrl").is_err());
        assert_eq!(item.string_field("thumbOffset").as_deref(), Some("1500"));
    }

    #[test]
    fn test_bool_field_variants() {
        let item = PublishItem::new("reels", "1")
            .with_field("a", true)
            .with_field("b", "false")
            .with_field("c", "maybe");
        assert_eq!(item.bool_field("a").unwrap(), Some(true));
        assert_eq!(item.bool_field("b").unwrap(), Some(false));
        assert!(item.bool_field("c").is_err());
        assert_eq!(item.bool_field("missing").unwrap(), None);
    }

    #[test]
    fn test_uint_field_variants() {
        let item = PublishItem::new("reels", "1")
            .with_field("a", 10)
            .with_field("b", "25")
            .with_field("c", -3);
        assert_eq!(item.uint_field("a").unwrap(), Some(10));
        assert_eq!(item.uint_field("b").unwrap(), Some(25));
        assert!(item.uint_field("c").is_err());
    }
}
