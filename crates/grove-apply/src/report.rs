//! Per-run results of the apply protocol.

use grove_types::{ChangeState, NodeId};

use crate::error::ApplyError;

/// Outcome of one [`apply`](crate::apply) run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Nodes created in the store, as `(cache id, permanent id)` pairs.
    pub created: Vec<(NodeId, NodeId)>,
    /// Nodes whose store value was replaced.
    pub updated: Vec<NodeId>,
    /// Nodes deleted in the store.
    pub deleted: Vec<NodeId>,
    /// Per-node failures, in processing order.
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    /// Returns `true` if every pending edit reached the store.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of edits that reached the store.
    pub fn applied_count(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    /// The permanent id assigned to the cache node `cache_id`, if it was
    /// created during this run.
    pub fn permanent_id(&self, cache_id: &NodeId) -> Option<NodeId> {
        self.created
            .iter()
            .find(|(old, _)| old == cache_id)
            .map(|(_, new)| *new)
    }
}

/// A pending edit that could not be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyFailure {
    /// Cache id of the node.
    pub id: NodeId,
    /// The pending state the node was in.
    pub state: ChangeState,
    pub error: ApplyError,
}
