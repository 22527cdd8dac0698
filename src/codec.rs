// 📦 Serialization Codec
// Whole registry <-> one JSON document:
//
//   { "<Kind>.<id>": { "__class__": "<Kind>", "id": ..., "created_at": ..., ... }, ... }
//
// Timestamps use one fixed text format in both directions.

use crate::entities::{self, Entity};
use crate::error::StoreError;
use chrono::{Local, NaiveDateTime, SubsecRound};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attribute holding the kind tag of a serialized entity
pub const CLASS_KEY: &str = "__class__";

/// Format written for `created_at` / `updated_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Accepted on read; the fraction is optional
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// Current local time at microsecond precision, so it survives a round trip
/// through `TIMESTAMP_FORMAT` unchanged.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(6)
}

pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(field: &str, value: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_PARSE_FORMAT).map_err(|_| {
        StoreError::Timestamp {
            field: field.to_string(),
            value: value.to_string(),
        }
    })
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Serialize every entry of the registry into one JSON document
pub fn encode(objects: &BTreeMap<String, Entity>) -> String {
    let document: Map<String, Value> = objects
        .iter()
        .map(|(key, entity)| (key.clone(), Value::Object(entity.to_map())))
        .collect();

    Value::Object(document).to_string()
}

/// Parse a JSON document back into registry entries.
///
/// Invalid JSON yields `StoreError::Syntax`; the caller decides whether that
/// is recoverable. Any other failure means the file holds something we
/// never wrote.
pub fn decode(text: &str) -> Result<BTreeMap<String, Entity>, StoreError> {
    let document: Value = serde_json::from_str(text).map_err(StoreError::Syntax)?;
    decode_document(&document)
}

/// Reconstruct every entry of an already-parsed document
pub fn decode_document(document: &Value) -> Result<BTreeMap<String, Entity>, StoreError> {
    let entries = document.as_object().ok_or_else(|| StoreError::Decode {
        key: String::new(),
        reason: "top-level value is not an object".to_string(),
    })?;

    entries
        .iter()
        .map(|(key, value)| decode_entry(key, value).map(|entity| (key.clone(), entity)))
        .collect()
}

/// Resolve the kind tag of one entry and rebuild the entity
pub fn decode_entry(key: &str, value: &Value) -> Result<Entity, StoreError> {
    let decode_err = |reason: &str| StoreError::Decode {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let attributes = value
        .as_object()
        .ok_or_else(|| decode_err("entry is not an object"))?;

    let tag = attributes
        .get(CLASS_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| decode_err("missing kind tag"))?;

    let kind = entities::resolve_kind(tag).ok_or_else(|| StoreError::UnknownKind {
        key: key.to_string(),
        kind: tag.to_string(),
    })?;

    let entity = Entity::reconstruct(kind, attributes)?;

    // Key prefix must agree with the stored kind
    if !key.starts_with(&format!("{}.", kind.name())) {
        return Err(decode_err("key does not match kind tag"));
    }

    Ok(entity)
}

// ============================================================================
// TESTS
// ============================================================================
