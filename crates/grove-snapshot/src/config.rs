use serde::{Deserialize, Serialize};

/// Wire format of a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Nested JSON records. Import salvages what it can from damaged files.
    #[default]
    Json,
    /// Compact bincode. Import is all or nothing.
    Bincode,
}

/// How snapshots are written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub codec: Codec,
    /// Indent JSON output. Ignored for bincode.
    pub pretty: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            codec: Codec::Json,
            pretty: true,
        }
    }
}

/// Shape of generated seed forests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Requested node counts below this are raised to it.
    pub min_nodes: usize,
    /// Requested node counts above this are lowered to it.
    pub max_nodes: usize,
    /// Node count used when none is requested.
    pub default_nodes: usize,
    /// Chance that a generated node becomes a candidate parent for later
    /// nodes. Lower values give flatter trees.
    pub branch_probability: f64,
    /// Value of the single generated root.
    pub root_title: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            min_nodes: 10,
            max_nodes: 1_000_000,
            default_nodes: 10,
            branch_probability: 0.7,
            root_title: "Root".into(),
        }
    }
}

impl SeedConfig {
    /// Resolve a requested node count against the configured bounds.
    pub fn node_count(&self, requested: Option<usize>) -> usize {
        let n = requested.unwrap_or(self.default_nodes);
        n.max(self.min_nodes).min(self.max_nodes.max(self.min_nodes))
    }
}
