use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::registry::Document;

/// Stream-level keys printed ahead of the chunk slots, in this order.
const LEADING_KEYS: [&str; 6] = [
    "master",
    "form_type",
    "byte_order",
    "bitrate",
    "bitrate_long",
    "chunk_ids",
];

/// Output switches for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Drop nulls, empty strings and empty lists or maps.
    pub purge: bool,
    /// Cut strings longer than `limit` characters and append `...`.
    pub truncate: bool,
    pub limit: usize,
    /// Single-line JSON instead of pretty-printed.
    pub compact: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            purge: true,
            truncate: false,
            limit: 100,
            compact: false,
        }
    }
}

/// Renders a decoded document as JSON.
pub fn render(document: &Document, options: &RenderOptions) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(document)?;
    if options.truncate {
        truncate(&mut value, options.limit);
    }
    if options.purge {
        purge(&mut value);
    }

    match &value {
        Value::Object(map) => {
            let ordered = Ordered(map);
            if options.compact {
                serde_json::to_string(&ordered)
            } else {
                serde_json::to_string_pretty(&ordered)
            }
        }
        other if options.compact => serde_json::to_string(other),
        other => serde_json::to_string_pretty(other),
    }
}

/// A top-level map serialized with [`LEADING_KEYS`] first and the rest in
/// key order.
struct Ordered<'a>(&'a Map<String, Value>);

impl Serialize for Ordered<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for key in LEADING_KEYS {
            if let Some(value) = self.0.get(key) {
                map.serialize_entry(key, value)?;
            }
        }
        for (key, value) in self.0 {
            if !LEADING_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn purge(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.values_mut().for_each(purge);
            map.retain(|_, v| !is_empty(v));
        }
        Value::Array(items) => {
            items.iter_mut().for_each(purge);
            items.retain(|v| !is_empty(v));
        }
        _ => {}
    }
}

fn truncate(value: &mut Value, limit: usize) {
    match value {
        Value::String(s) => {
            if let Some((cut, _)) = s.char_indices().nth(limit) {
                s.truncate(cut);
                s.push_str("...");
            }
        }
        Value::Object(map) => map.values_mut().for_each(|v| truncate(v, limit)),
        Value::Array(items) => items.iter_mut().for_each(|v| truncate(v, limit)),
        _ => {}
    }
}
