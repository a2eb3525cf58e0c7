//! Cache node views and persistence records.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use grove_types::{dismantle, ChangeState, NodeId, Nested};

/// A read-only view of one cached node.
///
/// Cache nodes have identity: two views are equal iff they carry the same id,
/// whatever their values or states.
#[derive(Clone, Debug)]
pub struct CacheNode<V> {
    pub id: NodeId,
    pub value: V,
    pub state: ChangeState,
    pub is_deleted: bool,
    /// Parent id recorded for an orphan waiting to be adopted.
    pub expected_parent_id: Option<NodeId>,
    /// Current structural parent inside the cache.
    pub parent_id: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl<V> CacheNode<V> {
    /// Returns `true` if the node sits in the root list waiting for a parent.
    pub fn is_orphan(&self) -> bool {
        self.parent_id.is_none() && self.expected_parent_id.is_some()
    }
}

impl<V> PartialEq for CacheNode<V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<V> Eq for CacheNode<V> {}

impl<V> Hash for CacheNode<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One node of a cache snapshot, with its children nested.
///
/// Carries everything a store record does plus the edit state and the
/// expected parent of orphans.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "V: Deserialize<'de>"))]
pub struct CacheTree<V> {
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub value: V,
    #[serde(default)]
    pub state: ChangeState,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub expected_parent_id: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<CacheTree<V>>,
}

impl<V> CacheTree<V> {
    /// A leaf record in the given state.
    pub fn new(id: NodeId, value: V, state: ChangeState) -> Self {
        Self {
            id,
            parent_id: None,
            value,
            state,
            is_deleted: matches!(state, ChangeState::Deleted),
            expected_parent_id: None,
            children: Vec::new(),
        }
    }

    /// Builder-style child append.
    pub fn with_child(mut self, mut child: CacheTree<V>) -> Self {
        child.parent_id = Some(self.id);
        self.children.push(child);
        self
    }
}

impl<V> Nested for CacheTree<V> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }
}

impl<V> Drop for CacheTree<V> {
    fn drop(&mut self) {
        dismantle(&mut self.children);
    }
}
