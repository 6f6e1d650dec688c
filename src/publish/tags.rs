//! User and product tag serialization.
//!
//! Tags are sent as a single JSON-encoded query parameter. Entries missing
//! their identifying field are dropped; an empty result omits the parameter.

use serde::Serialize;
use serde_json::Value;

use super::error::PublishError;
use super::item::{ProductTagInput, UserTagInput};

#[derive(Debug, Serialize)]
struct UserTag<'a> {
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ProductTag {
    /// Kept as the caller's scalar; numeric catalog ids stay numbers
    product_id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
}

/// Serialize user tags into the `user_tags` parameter value.
pub fn serialize_user_tags(tags: &[UserTagInput]) -> Result<Option<String>, PublishError> {
    let mut kept = Vec::with_capacity(tags.len());
    for tag in tags {
        let Some(username) = tag.username.as_deref().map(str::trim).filter(|u| !u.is_empty())
        else {
            continue;
        };
        kept.push(UserTag {
            username,
            x: coordinate("userTags.x", tag.x)?,
            y: coordinate("userTags.y", tag.y)?,
        });
    }
    encode("userTags", &kept)
}

/// Serialize product tags into the `product_tags` parameter value.
pub fn serialize_product_tags(tags: &[ProductTagInput]) -> Result<Option<String>, PublishError> {
    let mut kept = Vec::with_capacity(tags.len());
    for tag in tags {
        let Some(product_id) = product_id(tag.product_id.as_ref()) else {
            continue;
        };
        kept.push(ProductTag {
            product_id,
            x: coordinate("productTags.x", tag.x)?,
            y: coordinate("productTags.y", tag.y)?,
        });
    }
    encode("productTags", &kept)
}

fn product_id(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| Value::String(trimmed.to_string()))
        }
        Value::Number(n) => Some(Value::Number(n.clone())),
        _ => None,
    }
}

// Coordinates are fractions of the media's width and height.
fn coordinate(name: &str, value: Option<f64>) -> Result<Option<f64>, PublishError> {
    match value {
        None => Ok(None),
        Some(v) if (0.0..=1.0).contains(&v) => Ok(Some(v)),
        Some(v) => Err(PublishError::invalid(
            name,
            format!("{} is outside the 0-1 range", v),
        )),
    }
}

fn encode<T: Serialize>(name: &str, tags: &[T]) -> Result<Option<String>, PublishError> {
    if tags.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(tags)
        .map(Some)
        .map_err(|e| PublishError::invalid(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(username: Option<&str>, x: Option<f64>, y: Option<f64>) -> UserTagInput {
        UserTagInput {
            username: username.map(str::to_string),
            x,
            y,
        }
    }

    #[test]
    fn test_user_tags_drop_entries_without_username() {
        let tags = vec![
            user(Some("alice"), Some(0.5), Some(0.25)),
            user(None, Some(0.1), None),
            user(Some("  "), None, None),
            user(Some("bob"), None, None),
        ];
        let encoded = serialize_user_tags(&tags).unwrap().unwrap();
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            decoded,
            json!([{"username": "alice", "x": 0.5, "y": 0.25}, {"username": "bob"}])
        );
    }

    #[test]
    fn test_user_tags_empty_after_filtering_is_omitted() {
        let tags = vec![user(None, Some(0.3), Some(0.3))];
        assert_eq!(serialize_user_tags(&tags).unwrap(), None);
        assert_eq!(serialize_user_tags(&[]).unwrap(), None);
    }

    #[test]
    fn test_user_tags_reject_out_of_range() {
        let tags = vec![user(Some("alice"), Some(1.5), None)];
        let err = serialize_user_tags(&tags).unwrap_err();
        assert!(err.to_string().contains("userTags.x"));
    }

    #[test]
    fn test_product_tags_accept_numeric_ids() {
        let tags = vec![
            ProductTagInput {
                product_id: Some(json!(3231775643511089u64)),
                x: Some(0.5),
                y: Some(0.8),
            },
            ProductTagInput {
                product_id: None,
                x: Some(0.1),
                y: None,
            },
            ProductTagInput {
                product_id: Some(json!("998877")),
                x: None,
                y: None,
            },
        ];
        let encoded = serialize_product_tags(&tags).unwrap().unwrap();
        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            decoded,
            json!([
                {"product_id": 3231775643511089u64, "x": 0.5, "y": 0.8},
                {"product_id": "998877"}
            ])
        );
    }

    #[test]
    fn test_product_id_keeps_caller_type() {
        let tags = vec![
            ProductTagInput {
                product_id: Some(json!(42)),
                x: None,
                y: None,
            },
            ProductTagInput {
                product_id: Some(json!(" 42 ")),
                x: None,
                y: None,
            },
        ];
        let encoded = serialize_product_tags(&tags).unwrap().unwrap();
        assert_eq!(encoded, r#"[{"product_id":42},{"product_id":"42"}]"#);
    }

    #[test]
    fn test_product_tags_all_dropped() {
        let tags = vec![ProductTagInput {
            product_id: Some(json!("")),
            x: None,
            y: None,
        }];
        assert_eq!(serialize_product_tags(&tags).unwrap(), None);
    }
}
