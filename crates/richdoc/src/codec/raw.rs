//! Wire structs for the raw JSON document format.
//!
//! Every field a producer may omit is optional or defaulted, so a malformed
//! document deserializes into something the decoder can repair instead of
//! failing. Map key order is preserved end to end (`indexmap` /
//! `serde_json` with `preserve_order`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level wire document: blocks plus storage-keyed entity and meta maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawContentState {
    pub blocks: Vec<RawBlock>,
    pub entity_map: IndexMap<String, RawEntity>,
    pub meta_map: IndexMap<String, RawMeta>,
}

/// One wire block. Only `text` carries content; everything else defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    pub inline_style_ranges: Vec<RawStyleRange>,
    pub entity_ranges: Vec<RawEntityRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Map<String, Value>>,
}

/// A styled span. `offset`/`length` are in the producer's UTF-16 code
/// units. The optional `key` names a meta (style provenance) storage key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
}

/// An entity span. `key` is a storage key into `entityMap`; producers emit
/// it as either a JSON string or a number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntityRange {
    pub offset: usize,
    pub length: usize,
    pub key: Option<Value>,
}

/// A stored entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntity {
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub mutability: Option<String>,
    pub data: Option<serde_json::Map<String, Value>>,
}

/// A stored meta.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMeta {
    #[serde(rename = "type")]
    pub meta_type: Option<String>,
    pub data: Option<serde_json::Map<String, Value>>,
}

/// Normalizes a wire range key to the string form used for storage lookup.
pub(crate) fn storage_key(key: &Option<Value>) -> Option<String> {
    match key {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
