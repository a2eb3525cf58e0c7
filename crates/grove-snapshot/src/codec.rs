//! Encoding and decoding of store and cache snapshots.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use grove_cache::CacheTree;
use grove_store::NodeRecord;
use grove_types::{depth, NodeId, Nested};

use crate::config::{Codec, SnapshotConfig};
use crate::error::{SnapshotError, SnapshotResult};

/// Deepest forest a snapshot may hold.
///
/// `serde_json` refuses input nested more than 128 levels, and every record
/// level takes two of those (the record object and its `children` list).
/// The same bound applies to bincode so both codecs accept the same forests.
pub const MAX_DEPTH: usize = 60;

/// Encodes and decodes snapshots with a configured [`Codec`].
#[derive(Clone, Debug, Default)]
pub struct SnapshotCodec {
    config: SnapshotConfig,
}

impl SnapshotCodec {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Encode a store snapshot.
    pub fn encode_forest<V: Serialize>(&self, records: &[NodeRecord<V>]) -> SnapshotResult<Vec<u8>> {
        self.encode(records)
    }

    /// Decode a store snapshot. `None` means no usable data.
    pub fn decode_forest<V: DeserializeOwned>(&self, bytes: &[u8]) -> Option<Vec<NodeRecord<V>>> {
        self.decode(bytes)
    }

    /// Encode a cache snapshot.
    pub fn encode_cache<V: Serialize>(&self, forest: &[CacheTree<V>]) -> SnapshotResult<Vec<u8>> {
        self.encode(forest)
    }

    /// Decode a cache snapshot. `None` means no usable data.
    pub fn decode_cache<V: DeserializeOwned>(&self, bytes: &[u8]) -> Option<Vec<CacheTree<V>>> {
        self.decode(bytes)
    }

    /// Forests deeper than [`MAX_DEPTH`] are rejected before serializing,
    /// which would otherwise recurse once per level.
    fn encode<T: Nested + Serialize>(&self, records: &[T]) -> SnapshotResult<Vec<u8>> {
        let levels = depth(records);
        if levels > MAX_DEPTH {
            warn!(depth = levels, max = MAX_DEPTH, "forest too deep to snapshot");
            return Err(SnapshotError::TooDeep {
                depth: levels,
                max: MAX_DEPTH,
            });
        }
        let bytes = match self.config.codec {
            Codec::Json if self.config.pretty => serde_json::to_vec_pretty(records),
            Codec::Json => serde_json::to_vec(records),
            Codec::Bincode => {
                return bincode::serialize(records)
                    .map_err(|e| SnapshotError::Serialization(e.to_string()));
            }
        };
        bytes.map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    fn decode<T: Nested + DeserializeOwned>(&self, bytes: &[u8]) -> Option<Vec<T>> {
        let records = match self.config.codec {
            Codec::Json => salvage_json(bytes)?,
            Codec::Bincode => match bincode::deserialize::<Vec<T>>(bytes) {
                Ok(records) => records,
                Err(error) => {
                    warn!(%error, "unreadable bincode snapshot");
                    return None;
                }
            },
        };
        if records.is_empty() {
            debug!("snapshot holds no records");
            return None;
        }
        Some(records)
    }
}

/// Parse a JSON snapshot record by record, dropping whatever does not fit.
fn salvage_json<T: Nested + DeserializeOwned>(bytes: &[u8]) -> Option<Vec<T>> {
    let items = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!("JSON snapshot is not a list of records");
            return None;
        }
        Err(error) => {
            warn!(%error, "unreadable JSON snapshot");
            return None;
        }
    };

    let mut seen = HashSet::new();
    let mut skipped = 0;
    let records: Vec<T> = items
        .into_iter()
        .filter_map(|item| salvage_record(item, &mut seen, &mut skipped))
        .collect();
    if skipped > 0 {
        warn!(skipped, kept = seen.len(), "skipped malformed snapshot records");
    }
    Some(records)
}

/// Recursion depth is bounded by the JSON parser's nesting limit.
fn salvage_record<T: Nested + DeserializeOwned>(
    item: Value,
    seen: &mut HashSet<NodeId>,
    skipped: &mut usize,
) -> Option<T> {
    let Value::Object(mut fields) = item else {
        *skipped += 1;
        return None;
    };
    let children = fields.remove("children");

    let mut record: T = match serde_json::from_value(Value::Object(fields)) {
        Ok(record) => record,
        Err(error) => {
            debug!(%error, "malformed snapshot record");
            *skipped += 1;
            return None;
        }
    };
    if !seen.insert(record.id()) {
        warn!(node = %record.id(), "duplicate node id in snapshot");
        *skipped += 1;
        return None;
    }

    let children = match children {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|child| salvage_record(child, seen, skipped))
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            warn!(node = %record.id(), "children field is not a list");
            Vec::new()
        }
    };
    *record.children_mut() = children;
    Some(record)
}
