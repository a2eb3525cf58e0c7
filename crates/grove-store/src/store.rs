//! The authoritative [`TreeStore`].
//!
//! All state lives behind a single `RwLock`, so every public call is atomic
//! with respect to every other call on the same store. Nodes are located
//! through an id -> [`Location`] index; locations never go stale because
//! nodes are only ever appended, never moved or physically removed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use grove_types::{assemble, DisplayNode, NodeId, VisualState};

use crate::error::{StoreError, StoreResult};
use crate::node::{Forest, Location, TreeNode};
use crate::record::{records_to_forest, NodeRecord};

/// Authoritative, path-indexed forest with transactional logical deletion.
pub struct TreeStore<V = String> {
    inner: RwLock<Inner<V>>,
}

struct Inner<V> {
    roots: Forest<V>,
    index: HashMap<NodeId, Location>,
    in_transaction: bool,
}

impl<V: Clone> Inner<V> {
    fn from_forest(roots: Forest<V>) -> Self {
        let mut inner = Self {
            roots,
            index: HashMap::new(),
            in_transaction: false,
        };
        inner.rebuild_index();
        inner
    }

    fn rebuild_index(&mut self) {
        let mut index = HashMap::new();
        let mut stack: Vec<(&TreeNode<V>, Location)> = self
            .roots
            .iter()
            .enumerate()
            .rev()
            .map(|(i, root)| (root.as_ref(), Location::root(i)))
            .collect();

        while let Some((node, loc)) = stack.pop() {
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((child.as_ref(), loc.child(i)));
            }
            if index.contains_key(&node.id) {
                warn!(node = %node.id, "duplicate node id in forest, keeping first occurrence");
                continue;
            }
            index.insert(node.id, loc);
        }

        debug!(nodes = index.len(), roots = self.roots.len(), "rebuilt location index");
        self.index = index;
    }

    fn locate(&self, id: &NodeId) -> StoreResult<Location> {
        self.index.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    fn resolve(&self, loc: &Location) -> Option<&Arc<TreeNode<V>>> {
        let (first, rest) = loc.path().split_first()?;
        let mut node = self.roots.get(*first)?;
        for &i in rest {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    /// Resolve `loc` for writing, copying every shared node on the spine.
    fn resolve_mut(&mut self, loc: &Location) -> Option<&mut TreeNode<V>> {
        let (first, rest) = loc.path().split_first()?;
        let mut node = Arc::make_mut(self.roots.get_mut(*first)?);
        for &i in rest {
            node = Arc::make_mut(node.children.get_mut(i)?);
        }
        Some(node)
    }

    /// Whether the node at `loc` or any of its ancestors is flagged deleted.
    fn effectively_deleted(&self, loc: &Location) -> bool {
        let Some((first, rest)) = loc.path().split_first() else {
            return true;
        };
        let Some(mut node) = self.roots.get(*first) else {
            return true;
        };
        if node.is_deleted {
            return true;
        }
        for &i in rest {
            match node.children.get(i) {
                Some(child) if child.is_deleted => return true,
                Some(child) => node = child,
                None => return true,
            }
        }
        false
    }

    /// Copy deletion flags from every flagged node in the subtree at `start`
    /// onto its descendants. Returns the number of nodes newly flagged.
    fn cascade(&mut self, start: &Location) -> usize {
        // Collect first, then write only the affected spines, so subtrees
        // with nothing to flag stay shared.
        let mut flips = Vec::new();
        {
            let Some(start_node) = self.resolve(start) else {
                return 0;
            };
            let Some((&start_index, _)) = start.path().split_last() else {
                return 0;
            };
            // One path buffer for the whole walk. Each frame records the
            // path length at which it sits and its index among siblings.
            let mut path = start.path().to_vec();
            let mut stack: Vec<(&TreeNode<V>, usize, usize, bool)> =
                vec![(start_node.as_ref(), path.len(), start_index, false)];
            while let Some((node, len, index, inherited)) = stack.pop() {
                path.truncate(len - 1);
                path.push(index);
                if inherited && !node.is_deleted {
                    flips.push(Location::from_path(path.clone()));
                }
                let deleted = inherited || node.is_deleted;
                for (i, child) in node.children.iter().enumerate() {
                    stack.push((child.as_ref(), len + 1, i, deleted));
                }
            }
        }

        for loc in &flips {
            if let Some(node) = self.resolve_mut(loc) {
                node.is_deleted = true;
            }
        }
        flips.len()
    }
}

impl<V: Clone> TreeStore<V> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_forest(Vec::new())
    }

    /// Create a store holding `forest`.
    pub fn from_forest(forest: Forest<V>) -> Self {
        Self {
            inner: RwLock::new(Inner::from_forest(forest)),
        }
    }

    /// Create a store from snapshot records.
    pub fn from_records(records: Vec<NodeRecord<V>>) -> Self {
        Self::from_forest(records_to_forest(&records))
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<V>> {
        self.inner.read().expect("lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<V>> {
        self.inner.write().expect("lock poisoned")
    }

    // ---------------------------------------------------------------
    // Forest lifecycle
    // ---------------------------------------------------------------

    /// Replace the whole forest and rebuild the location index.
    ///
    /// Any transaction in progress is abandoned; flags already set stay set
    /// but are not cascaded.
    pub fn reinitialize(&self, forest: Forest<V>) {
        let mut inner = self.write();
        *inner = Inner::from_forest(forest);
    }

    /// Structurally shared copy of the current forest.
    ///
    /// Cheap (one reference count per root). Later mutations of the store
    /// copy the nodes they touch and leave the snapshot unchanged.
    pub fn snapshot(&self) -> Forest<V> {
        self.read().roots.clone()
    }

    /// Export the forest as snapshot records.
    pub fn export_records(&self) -> Vec<NodeRecord<V>> {
        NodeRecord::from_forest(&self.snapshot())
    }

    /// Number of nodes in the store, deleted ones included.
    pub fn len(&self) -> usize {
        self.read().index.len()
    }

    /// Returns `true` if the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.read().index.is_empty()
    }

    /// IDs of the forest roots, in order.
    pub fn root_ids(&self) -> Vec<NodeId> {
        self.read().roots.iter().map(|r| r.id).collect()
    }

    // ---------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------

    /// Enter transactional mode. Idempotent.
    pub fn start_transaction(&self) {
        let mut inner = self.write();
        if !inner.in_transaction {
            inner.in_transaction = true;
            debug!("store transaction started");
        }
    }

    /// Cascade every deletion flag in the forest onto its descendants and
    /// leave transactional mode. No-op outside a transaction.
    pub fn commit_transaction(&self) {
        let mut inner = self.write();
        if !inner.in_transaction {
            return;
        }
        let mut flagged = 0;
        for i in 0..inner.roots.len() {
            flagged += inner.cascade(&Location::root(i));
        }
        inner.in_transaction = false;
        debug!(flagged, "store transaction committed");
    }

    /// Returns `true` while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.read().in_transaction
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// The node with `id`, whether or not it is deleted.
    pub fn get(&self, id: &NodeId) -> Option<Arc<TreeNode<V>>> {
        let inner = self.read();
        let loc = inner.index.get(id)?;
        inner.resolve(loc).cloned()
    }

    /// The node with `id` if it exists and is not effectively deleted.
    pub fn get_non_deleted(&self, id: &NodeId) -> Option<Arc<TreeNode<V>>> {
        let inner = self.read();
        let loc = inner.index.get(id)?;
        if inner.effectively_deleted(loc) {
            return None;
        }
        inner.resolve(loc).cloned()
    }

    /// Effective deletion status. Unknown ids count as deleted.
    pub fn is_deleted(&self, id: &NodeId) -> bool {
        let inner = self.read();
        match inner.index.get(id) {
            Some(loc) => inner.effectively_deleted(loc),
            None => true,
        }
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `descendant`.
    pub fn is_ancestor(&self, ancestor: &NodeId, descendant: &NodeId) -> bool {
        let inner = self.read();
        match (inner.index.get(ancestor), inner.index.get(descendant)) {
            (Some(a), Some(d)) => a.is_strict_prefix_of(d),
            _ => false,
        }
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Replace the value of a live node.
    pub fn update_value(&self, id: &NodeId, value: V) -> StoreResult<()> {
        let mut inner = self.write();
        let loc = inner.locate(id)?;
        if inner.effectively_deleted(&loc) {
            return Err(StoreError::Deleted(*id));
        }
        let node = inner.resolve_mut(&loc).ok_or(StoreError::NotFound(*id))?;
        node.value = value;
        debug!(node = %id.short_id(), "updated node value");
        Ok(())
    }

    /// Append a new root holding `value` and return its fresh id.
    pub fn create_root(&self, value: V) -> NodeId {
        let mut inner = self.write();
        let id = NodeId::new();
        let loc = Location::root(inner.roots.len());
        inner.roots.push(Arc::new(TreeNode::new(id, None, value)));
        inner.index.insert(id, loc);
        debug!(node = %id.short_id(), "created root");
        id
    }

    /// Append a new last child of `parent_id` and return its fresh id.
    ///
    /// Fails if the parent is unknown or effectively deleted.
    pub fn create_child(&self, parent_id: &NodeId, value: V) -> StoreResult<NodeId> {
        let mut inner = self.write();
        let parent_loc = inner.locate(parent_id)?;
        if inner.effectively_deleted(&parent_loc) {
            return Err(StoreError::Deleted(*parent_id));
        }
        let id = NodeId::new();
        let parent = inner
            .resolve_mut(&parent_loc)
            .ok_or(StoreError::NotFound(*parent_id))?;
        let loc = parent_loc.child(parent.children.len());
        parent.push_child(TreeNode::new(id, Some(*parent_id), value));
        inner.index.insert(id, loc);
        debug!(node = %id.short_id(), parent = %parent_id.short_id(), "created child");
        Ok(id)
    }

    /// Logically delete a node.
    ///
    /// Outside a transaction the flag is cascaded to all descendants right
    /// away; inside one the cascade waits for [`commit_transaction`].
    /// Deleting a node that is already deleted through an ancestor is a
    /// no-op.
    ///
    /// [`commit_transaction`]: TreeStore::commit_transaction
    pub fn delete(&self, id: &NodeId) -> StoreResult<()> {
        let mut inner = self.write();
        let loc = inner.locate(id)?;
        if inner.effectively_deleted(&loc) {
            let own_flag = inner.resolve(&loc).is_some_and(|n| n.is_deleted);
            if !own_flag {
                return Ok(());
            }
        }
        let node = inner.resolve_mut(&loc).ok_or(StoreError::NotFound(*id))?;
        node.is_deleted = true;

        if inner.in_transaction {
            debug!(node = %id.short_id(), "deleted node, cascade deferred");
        } else {
            let flagged = inner.cascade(&loc);
            debug!(node = %id.short_id(), flagged, "deleted node");
        }
        Ok(())
    }
}

impl<V: Clone + fmt::Display> TreeStore<V> {
    /// Export the live part of the forest for rendering.
    ///
    /// Effectively deleted nodes and their subtrees are left out.
    pub fn display_forest(&self) -> Vec<DisplayNode> {
        let roots = self.snapshot();
        let mut entries = Vec::new();
        let mut stack: Vec<(&TreeNode<V>, Option<usize>)> =
            roots.iter().rev().map(|r| (r.as_ref(), None)).collect();

        while let Some((node, parent)) = stack.pop() {
            if node.is_deleted {
                continue;
            }
            let position = entries.len();
            entries.push((
                parent,
                DisplayNode::new(node.id, node.value.to_string(), VisualState::Normal),
            ));
            stack.extend(node.children.iter().rev().map(|c| (c.as_ref(), Some(position))));
        }

        assemble(entries)
    }
}

impl<V: Clone> Default for TreeStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for TreeStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TreeStore");
        match self.inner.read() {
            Ok(inner) => s
                .field("node_count", &inner.index.len())
                .field("root_count", &inner.roots.len())
                .field("in_transaction", &inner.in_transaction),
            Err(_) => s.field("poisoned", &true),
        };
        s.finish()
    }
}
