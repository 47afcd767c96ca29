//! Shard schema normalization
//!
//! Shard files come in two shapes: a bare JSON array of records, or an
//! object wrapping the array under a `names` key. Both are decoded here,
//! once, at the I/O boundary — the rest of the pipeline only ever sees
//! `NameRecord`s, in original file order, plus the shape needed to write
//! the file back the way it was found.

use crate::models::NameRecord;
use namebase_common::{Error, Result};
use serde_json::{Map, Value};

/// On-disk shard shape, preserved across a load/save cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardShape {
    /// `[ {..}, {..} ]`
    BareArray,
    /// `{ "names": [ {..}, {..} ] }`
    Wrapped,
}

/// Decoded shard: records in original order plus the wrapper fields (if any)
/// that must survive write-back.
#[derive(Debug, Clone)]
pub struct DecodedShard {
    pub shape: ShardShape,
    pub records: Vec<NameRecord>,
    /// Sibling keys of `names` in wrapped shards, passed through on save
    pub wrapper_extra: Map<String, Value>,
}

/// Decode a parsed shard value into ordered records.
///
/// A value that is neither an array nor an object carrying a `names` array
/// is a load error for the whole shard — it must never be treated as empty.
pub fn decode_shard(value: Value) -> Result<DecodedShard> {
    match value {
        Value::Array(items) => Ok(DecodedShard {
            shape: ShardShape::BareArray,
            records: decode_records(items)?,
            wrapper_extra: Map::new(),
        }),
        Value::Object(mut obj) => match obj.remove("names") {
            Some(Value::Array(items)) => Ok(DecodedShard {
                shape: ShardShape::Wrapped,
                records: decode_records(items)?,
                wrapper_extra: obj,
            }),
            Some(_) => Err(Error::InvalidInput(
                "shard `names` key is not an array".to_string(),
            )),
            None => Err(Error::InvalidInput(
                "shard is neither a record array nor an object with a `names` array".to_string(),
            )),
        },
        _ => Err(Error::InvalidInput(
            "shard is neither a record array nor an object with a `names` array".to_string(),
        )),
    }
}

/// Re-encode records into the shape the shard was loaded with.
pub fn encode_shard(shard: &DecodedShard) -> Result<Value> {
    let items = shard
        .records
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match shard.shape {
        ShardShape::BareArray => Ok(Value::Array(items)),
        ShardShape::Wrapped => {
            let mut obj = shard.wrapper_extra.clone();
            obj.insert("names".to_string(), Value::Array(items));
            Ok(Value::Object(obj))
        }
    }
}

fn decode_records(items: Vec<Value>) -> Result<Vec<NameRecord>> {
    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let mut record: NameRecord = serde_json::from_value(item)
            .map_err(|e| Error::InvalidInput(format!("record {}: {}", idx, e)))?;
        if record.name.trim().is_empty() {
            return Err(Error::InvalidInput(format!("record {}: missing name", idx)));
        }
        // Remember the surface form before any later casing normalization
        if record.original_name.is_none() {
            record.original_name = Some(record.name.clone());
        }
        records.push(record);
    }
    Ok(records)
}
