//! Media resource registry
//!
//! Each supported media type is a [`MediaKind`] variant that knows how to
//! build its creation payload and which timing governs its polling and
//! publish retries. The set is closed; the registry is built once at start-up
//! and only read afterwards.

use std::fmt;
use std::num::{NonZeroU32, NonZeroU64};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::PublishError;
use super::item::PublishItem;

/// Option value of the UI-only comments resource
pub const COMMENTS_RESOURCE: &str = "comments";

const fn ms(value: u64) -> NonZeroU64 {
    match NonZeroU64::new(value) {
        Some(v) => v,
        None => panic!("timing value must be positive"),
    }
}

const fn count(value: u32) -> NonZeroU32 {
    match NonZeroU32::new(value) {
        Some(v) => v,
        None => panic!("attempt count must be positive"),
    }
}

/// Supported media types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Reels,
    Stories,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Image, MediaKind::Reels, MediaKind::Stories];

    pub fn key(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Reels => "reels",
            MediaKind::Stories => "stories",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Reels => "Reels",
            MediaKind::Stories => "Stories",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Polling and retry timing used when configuration does not override it
    pub fn default_timing(&self) -> Timing {
        match self {
            MediaKind::Image => Timing::new(ms(1500), count(20), ms(1500), count(3)),
            MediaKind::Reels => Timing::new(ms(3000), count(60), ms(3000), count(5)),
            MediaKind::Stories => Timing::new(ms(1500), count(30), ms(1500), count(3)),
        }
    }

    /// Extra input fields this media type reads from an item
    pub fn input_fields(&self) -> Vec<InputField> {
        match self {
            MediaKind::Image => vec![InputField::string(
                "imageUrl",
                "Image URL",
                true,
                "Public URL of the JPEG image to publish",
            )],
            MediaKind::Reels => vec![
                InputField::string("videoUrl", "Video URL", true, "Public URL of the video"),
                InputField::string(
                    "coverUrl",
                    "Cover URL",
                    false,
                    "Public URL of a cover image",
                ),
                InputField::boolean(
                    "shareToFeed",
                    "Share to Feed",
                    "Also show the reel in the main feed",
                ),
                InputField::number(
                    "thumbOffset",
                    "Thumbnail Offset",
                    "Frame offset in milliseconds used as thumbnail",
                ),
            ],
            MediaKind::Stories => vec![
                InputField::string(
                    "imageUrl",
                    "Image URL",
                    false,
                    "Public URL of the story image (set this or Video URL)",
                ),
                InputField::string(
                    "videoUrl",
                    "Video URL",
                    false,
                    "Public URL of the story video (set this or Image URL)",
                ),
            ],
        }
    }

    /// Build the creation payload fields for `item`.
    pub fn build_payload(&self, item: &PublishItem) -> Result<PayloadFields, PublishError> {
        let mut payload = PayloadFields::new();
        match self {
            MediaKind::Image => {
                payload.insert("image_url", item.require_string("imageUrl")?);
            }
            MediaKind::Reels => {
                payload.insert("video_url", item.require_string("videoUrl")?);
                payload.insert("media_type", "REELS");
                if let Some(cover) = item.string_field("coverUrl") {
                    payload.insert("cover_url", cover);
                }
                if let Some(share) = item.bool_field("shareToFeed")? {
                    payload.insert("share_to_feed", share.to_string());
                }
                if let Some(offset) = item.uint_field("thumbOffset")? {
                    payload.insert("thumb_offset", offset.to_string());
                }
            }
            MediaKind::Stories => {
                match (item.string_field("imageUrl"), item.string_field("videoUrl")) {
                    (Some(image), None) => payload.insert("image_url", image),
                    (None, Some(video)) => payload.insert("video_url", video),
                    (Some(_), Some(_)) => {
                        return Err(PublishError::invalid(
                            "imageUrl",
                            "a story takes either imageUrl or videoUrl, not both",
                        ))
                    }
                    (None, None) => {
                        return Err(PublishError::invalid(
                            "imageUrl",
                            "a story needs imageUrl or videoUrl",
                        ))
                    }
                }
                payload.insert("media_type", "STORIES");
            }
        }
        Ok(payload)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Ordered platform-specific fields merged into the creation request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadFields {
    entries: Vec<(String, String)>,
}

impl PayloadFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping its first position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Polling and publish-retry timing for one media type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub poll_interval_ms: NonZeroU64,
    pub max_poll_attempts: NonZeroU32,
    pub publish_retry_delay_ms: NonZeroU64,
    pub publish_max_attempts: NonZeroU32,
}

impl Timing {
    pub const fn new(
        poll_interval_ms: NonZeroU64,
        max_poll_attempts: NonZeroU32,
        publish_retry_delay_ms: NonZeroU64,
        publish_max_attempts: NonZeroU32,
    ) -> Self {
        Self {
            poll_interval_ms,
            max_poll_attempts,
            publish_retry_delay_ms,
            publish_max_attempts,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.get())
    }

    pub fn publish_retry_delay(&self) -> Duration {
        Duration::from_millis(self.publish_retry_delay_ms.get())
    }

    /// Apply the fields set in `patch`
    pub fn patched(mut self, patch: &TimingOverride) -> Self {
        if let Some(v) = patch.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = patch.max_poll_attempts {
            self.max_poll_attempts = v;
        }
        if let Some(v) = patch.publish_retry_delay_ms {
            self.publish_retry_delay_ms = v;
        }
        if let Some(v) = patch.publish_max_attempts {
            self.publish_max_attempts = v;
        }
        self
    }
}

/// Partial timing from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<NonZeroU64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_poll_attempts: Option<NonZeroU32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_retry_delay_ms: Option<NonZeroU64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_max_attempts: Option<NonZeroU32>,
}

/// A media type bound to its timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub kind: MediaKind,
    pub timing: Timing,
}

impl ResourceDescriptor {
    pub fn new(kind: MediaKind, timing: Timing) -> Self {
        Self { kind, timing }
    }

    pub fn key(&self) -> &'static str {
        self.kind.key()
    }

    pub fn build_payload(&self, item: &PublishItem) -> Result<PayloadFields, PublishError> {
        self.kind.build_payload(item)
    }
}

/// Type of an input field, for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Boolean,
    Number,
}

/// Description of a resource-specific input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub description: String,
}

impl InputField {
    fn string(name: &str, display_name: &str, required: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            field_type: FieldType::String,
            required,
            description: description.to_string(),
        }
    }

    fn boolean(name: &str, display_name: &str, description: &str) -> Self {
        Self {
            field_type: FieldType::Boolean,
            ..Self::string(name, display_name, false, description)
        }
    }

    fn number(name: &str, display_name: &str, description: &str) -> Self {
        Self {
            field_type: FieldType::Number,
            ..Self::string(name, display_name, false, description)
        }
    }
}

/// Entry of the resource selector shown by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOption {
    pub name: String,
    pub value: String,
    /// False for entries that exist only in the selector
    pub supported: bool,
}

/// Lookup table from resource key to descriptor
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    descriptors: Vec<ResourceDescriptor>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    /// Registry with default timing for every media type
    pub fn new() -> Self {
        Self {
            descriptors: MediaKind::ALL
                .into_iter()
                .map(|kind| ResourceDescriptor::new(kind, kind.default_timing()))
                .collect(),
        }
    }

    /// Registry with per-kind timing patches applied over the defaults
    pub fn with_overrides<'a>(
        overrides: impl IntoIterator<Item = (MediaKind, &'a TimingOverride)>,
    ) -> Self {
        let mut registry = Self::new();
        for (kind, patch) in overrides {
            if let Some(descriptor) = registry.descriptors.iter_mut().find(|d| d.kind == kind) {
                descriptor.timing = descriptor.timing.patched(patch);
            }
        }
        registry
    }

    /// Registry with the same timing for every media type
    pub fn with_uniform_timing(timing: Timing) -> Self {
        Self {
            descriptors: MediaKind::ALL
                .into_iter()
                .map(|kind| ResourceDescriptor::new(kind, timing))
                .collect(),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&ResourceDescriptor> {
        self.descriptors.iter().find(|d| d.key() == key)
    }

    pub fn descriptors(&self) -> &[ResourceDescriptor] {
        &self.descriptors
    }

    /// Selector entries, including the unsupported comments pseudo-resource
    pub fn resource_options(&self) -> Vec<ResourceOption> {
        let mut options: Vec<ResourceOption> = self
            .descriptors
            .iter()
            .map(|d| ResourceOption {
                name: d.kind.display_name().to_string(),
                value: d.key().to_string(),
                supported: true,
            })
            .collect();
        options.push(ResourceOption {
            name: "Comments".to_string(),
            value: COMMENTS_RESOURCE.to_string(),
            supported: false,
        });
        options
    }

    /// Union of every descriptor's input fields, keyed by name.
    ///
    /// A later descriptor replaces an earlier field of the same name; the
    /// field keeps the position where its name first appeared.
    pub fn input_fields(&self) -> Vec<InputField> {
        let mut merged: Vec<InputField> = Vec::new();
        for field in self.descriptors.iter().flat_map(|d| d.kind.input_fields()) {
            match merged.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = field,
                None => merged.push(field),
            }
        }
        merged
    }
}
