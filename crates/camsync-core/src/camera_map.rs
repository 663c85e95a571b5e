//! Camera map: which channels to publish for each device group.
//!
//! The on-disk format is a JSON object keyed by device or vehicle id:
//!
//! ```json
//! {
//!   "14882506144": [
//!     { "name": "Car Camera 1", "channel": 0 },
//!     { "name": "Car Camera 2", "channel": 1 }
//!   ]
//! }
//! ```
//!
//! Key order from the file is preserved so snapshots come out in the order
//! the operator wrote them.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::{CoreError, Result};

/// One channel to publish for every online device of a group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelSpec {
    /// Display label.
    #[serde(rename = "name")]
    pub label: String,
    /// Zero-based channel index on the device.
    #[serde(deserialize_with = "channel_number")]
    pub channel: u32,
}

impl ChannelSpec {
    pub fn new(label: impl Into<String>, channel: u32) -> Self {
        Self {
            label: label.into(),
            channel,
        }
    }
}

/// A group key (device id or vehicle plate) and its channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraGroup {
    pub key: String,
    pub channels: Vec<ChannelSpec>,
}

/// Ordered group key -> channel layout mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraMap {
    groups: Vec<CameraGroup>,
}

impl CameraMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group. A repeated key replaces the earlier group in place.
    pub fn with_group(mut self, key: impl Into<String>, channels: Vec<ChannelSpec>) -> Self {
        self.insert(key.into(), channels);
        self
    }

    fn insert(&mut self, key: String, channels: Vec<ChannelSpec>) {
        match self.groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.channels = channels,
            None => self.groups.push(CameraGroup { key, channels }),
        }
    }

    /// Parse from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::InvalidCameraMap(e.to_string()))
    }

    pub fn groups(&self) -> &[CameraGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Total number of configured channels across all groups.
    pub fn channel_count(&self) -> usize {
        self.groups.iter().map(|g| g.channels.len()).sum()
    }
}

impl<'de> Deserialize<'de> for CameraMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CameraMapVisitor;

        impl<'de> Visitor<'de> for CameraMapVisitor {
            type Value = CameraMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of group key -> channel list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<CameraMap, A::Error> {
                let mut map = CameraMap::new();
                while let Some((key, channels)) = access.next_entry::<String, Vec<ChannelSpec>>()? {
                    map.insert(key, channels);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(CameraMapVisitor)
    }
}

/// Accept `"channel": 2` as well as `"channel": "2"`.
fn channel_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("channel is not a number: {s:?}"))),
    }
}
