//! The [`ChangeCache`] and its node arena.
//!
//! Nodes live in an arena of slots addressed by handles. Parents own their
//! children through handle lists, and each node keeps a non-owning parent
//! handle for upward walks. Removed slots go to a free list and are reused.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use grove_types::{assemble, ChangeState, DisplayNode, NodeId, VisualState};

use crate::error::{CacheError, CacheResult};
use crate::node::{CacheNode, CacheTree};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Handle(usize);

struct Slot<V> {
    id: NodeId,
    value: V,
    state: ChangeState,
    is_deleted: bool,
    expected_parent_id: Option<NodeId>,
    parent: Option<Handle>,
    children: Vec<Handle>,
}

impl<V> Slot<V> {
    fn new(id: NodeId, value: V, state: ChangeState) -> Self {
        Self {
            id,
            value,
            state,
            is_deleted: false,
            expected_parent_id: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

struct Arena<V> {
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    index: HashMap<NodeId, Handle>,
    roots: Vec<Handle>,
    dirty: HashSet<Handle>,
}

impl<V> Arena<V> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            roots: Vec::new(),
            dirty: HashSet::new(),
        }
    }

    fn slot(&self, h: Handle) -> Option<&Slot<V>> {
        self.slots.get(h.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, h: Handle) -> Option<&mut Slot<V>> {
        self.slots.get_mut(h.0).and_then(Option::as_mut)
    }

    fn lookup(&self, id: &NodeId) -> Option<Handle> {
        self.index.get(id).copied()
    }

    fn locate(&self, id: &NodeId) -> CacheResult<Handle> {
        self.lookup(id).ok_or(CacheError::NotFound(*id))
    }

    fn alloc(&mut self, slot: Slot<V>) -> Handle {
        let id = slot.id;
        let h = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                Handle(i)
            }
            None => {
                self.slots.push(Some(slot));
                Handle(self.slots.len() - 1)
            }
        };
        self.index.insert(id, h);
        h
    }

    /// Attach `h` under `parent_id` if it is cached, otherwise append it to
    /// the root list remembering `parent_id` as the expected parent.
    fn attach(&mut self, h: Handle, parent_id: Option<NodeId>) {
        let parent = parent_id.and_then(|p| self.lookup(&p)).filter(|p| *p != h);
        match parent {
            Some(p) => {
                if let Some(parent_slot) = self.slot_mut(p) {
                    parent_slot.children.push(h);
                }
                if let Some(slot) = self.slot_mut(h) {
                    slot.parent = Some(p);
                    slot.expected_parent_id = None;
                }
            }
            None => {
                self.roots.push(h);
                if let Some(slot) = self.slot_mut(h) {
                    slot.expected_parent_id = parent_id;
                }
            }
        }
    }

    /// Whether `candidate` is `of` or one of its ancestors.
    fn is_ancestor_or_self(&self, candidate: Handle, of: Handle) -> bool {
        let mut current = Some(of);
        while let Some(h) = current {
            if h == candidate {
                return true;
            }
            current = self.slot(h).and_then(|s| s.parent);
        }
        false
    }

    /// Move every root orphan waiting on `parent_id` under it, then repeat
    /// for each adopted node until no more orphans resolve.
    fn adopt_orphans(&mut self, parent_id: NodeId) -> usize {
        let mut adopted = 0;
        let mut queue = vec![parent_id];

        while let Some(pid) = queue.pop() {
            let Some(ph) = self.lookup(&pid) else {
                continue;
            };
            let waiting: Vec<Handle> = self
                .roots
                .iter()
                .copied()
                .filter(|h| {
                    self.slot(*h)
                        .is_some_and(|s| s.expected_parent_id == Some(pid))
                })
                .collect();

            for h in waiting {
                if self.is_ancestor_or_self(h, ph) {
                    warn!(parent = %pid, "refusing adoption that would create a cycle");
                    continue;
                }
                self.roots.retain(|r| *r != h);
                if let Some(parent_slot) = self.slot_mut(ph) {
                    parent_slot.children.push(h);
                }
                if let Some(slot) = self.slot_mut(h) {
                    slot.parent = Some(ph);
                    slot.expected_parent_id = None;
                    queue.push(slot.id);
                }
                adopted += 1;
            }
        }

        if adopted > 0 {
            debug!(parent = %parent_id.short_id(), adopted, "adopted orphans");
        }
        adopted
    }

    fn prune_roots(&mut self) {
        let slots = &self.slots;
        self.roots.retain(|h| {
            slots
                .get(h.0)
                .and_then(Option::as_ref)
                .is_some_and(|s| s.parent.is_none())
        });
    }

    fn detach(&mut self, h: Handle) {
        match self.slot(h).and_then(|s| s.parent) {
            Some(p) => {
                if let Some(parent_slot) = self.slot_mut(p) {
                    parent_slot.children.retain(|c| *c != h);
                }
            }
            None => self.roots.retain(|r| *r != h),
        }
    }

    /// Remove the subtree at `h` from the cache entirely.
    fn purge(&mut self, h: Handle) -> usize {
        self.detach(h);
        let mut removed = 0;
        let mut stack = vec![h];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.0).and_then(Option::take) else {
                continue;
            };
            self.index.remove(&slot.id);
            self.dirty.remove(&current);
            self.free.push(current.0);
            stack.extend(slot.children);
            removed += 1;
        }
        removed
    }

    /// Mark the subtree at `h` deleted. Descendants that were never applied
    /// are purged instead.
    fn mark_deleted(&mut self, h: Handle) -> (usize, usize) {
        let (mut marked, mut purged) = (0, 0);
        let mut stack = vec![h];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slot_mut(current) else {
                continue;
            };
            if slot.state == ChangeState::New {
                purged += self.purge(current);
                continue;
            }
            slot.state = ChangeState::Deleted;
            slot.is_deleted = true;
            stack.extend(slot.children.iter().copied());
            self.dirty.insert(current);
            marked += 1;
        }
        (marked, purged)
    }

    /// All live handles, parents before children, siblings in order.
    fn preorder(&self) -> Vec<Handle> {
        let mut order = Vec::with_capacity(self.index.len());
        let mut stack: Vec<Handle> = self.roots.iter().rev().copied().collect();
        while let Some(h) = stack.pop() {
            let Some(slot) = self.slot(h) else {
                continue;
            };
            order.push(h);
            stack.extend(slot.children.iter().rev().copied());
        }
        order
    }
}

impl<V> std::ops::Index<Handle> for Arena<V> {
    type Output = Slot<V>;

    /// Panics on a vacant slot, like indexing a `Vec` out of bounds.
    fn index(&self, h: Handle) -> &Slot<V> {
        match self.slot(h) {
            Some(slot) => slot,
            None => panic!("vacant cache slot {}", h.0),
        }
    }
}

impl<V: Clone> Arena<V> {
    fn view(&self, h: Handle) -> Option<CacheNode<V>> {
        self.slot(h).map(|slot| self.view_slot(slot))
    }

    fn view_slot(&self, slot: &Slot<V>) -> CacheNode<V> {
        CacheNode {
            id: slot.id,
            value: slot.value.clone(),
            state: slot.state,
            is_deleted: slot.is_deleted,
            expected_parent_id: slot.expected_parent_id,
            parent_id: slot.parent.and_then(|p| self.slot(p)).map(|p| p.id),
            children: slot
                .children
                .iter()
                .filter_map(|c| self.slot(*c))
                .map(|c| c.id)
                .collect(),
        }
    }

    /// Nested records for `roots`, built from a pre-order walk.
    fn export_forest(&self, roots: &[Handle]) -> Vec<CacheTree<V>> {
        let mut entries = Vec::with_capacity(self.index.len());
        let mut stack: Vec<(Handle, Option<usize>)> = roots.iter().rev().map(|h| (*h, None)).collect();

        while let Some((h, parent)) = stack.pop() {
            let Some(slot) = self.slot(h) else {
                continue;
            };
            let position = entries.len();
            entries.push((
                parent,
                CacheTree {
                    id: slot.id,
                    parent_id: slot.parent.and_then(|p| self.slot(p)).map(|p| p.id),
                    value: slot.value.clone(),
                    state: slot.state,
                    is_deleted: slot.is_deleted,
                    expected_parent_id: slot.expected_parent_id,
                    children: Vec::new(),
                },
            ));
            stack.extend(slot.children.iter().rev().map(|c| (*c, Some(position))));
        }

        assemble(entries)
    }
}

/// Client-editable mirror of the store with dirty tracking.
///
/// Every public call takes the internal lock for its whole duration, so
/// calls are atomic with respect to each other.
pub struct ChangeCache<V = String> {
    inner: RwLock<Arena<V>>,
}

impl<V: Clone> ChangeCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arena::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Arena<V>> {
        self.inner.read().expect("lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arena<V>> {
        self.inner.write().expect("lock poisoned")
    }

    // ---------------------------------------------------------------
    // Mirroring and editing
    // ---------------------------------------------------------------

    /// Mirror a store node into the cache.
    ///
    /// If `id` is already cached its value is refreshed and it is reset to
    /// `unchanged` and not deleted. Otherwise the node is attached under
    /// `parent_id`, or kept as an orphan root until that parent arrives.
    pub fn insert_node(&self, id: NodeId, value: V, parent_id: Option<NodeId>) -> CacheNode<V> {
        let mut arena = self.write();

        if let Some(h) = arena.lookup(&id) {
            if let Some(slot) = arena.slot_mut(h) {
                slot.value = value;
                slot.state = ChangeState::Unchanged;
                slot.is_deleted = false;
            }
            arena.dirty.remove(&h);
            arena.adopt_orphans(id);
            arena.prune_roots();
            debug!(node = %id.short_id(), "re-synced cached node");
            return arena.view_slot(&arena[h]);
        }

        let h = arena.alloc(Slot::new(id, value, ChangeState::Unchanged));
        arena.attach(h, parent_id);
        arena.adopt_orphans(id);
        arena.prune_roots();
        debug!(node = %id.short_id(), "mirrored node into cache");
        arena.view_slot(&arena[h])
    }

    /// Create a cache-only node with a fresh synthetic id.
    pub fn create_node(&self, value: V, parent_id: Option<NodeId>) -> CacheNode<V> {
        let mut arena = self.write();
        let id = NodeId::new();
        let h = arena.alloc(Slot::new(id, value, ChangeState::New));
        arena.attach(h, parent_id);
        arena.dirty.insert(h);
        arena.adopt_orphans(id);
        arena.prune_roots();
        debug!(node = %id.short_id(), "created cache node");
        arena.view_slot(&arena[h])
    }

    /// Re-key a node, typically when the store hands back a permanent id
    /// for a node applied as `new`. Orphans waiting on `new_id` are adopted.
    pub fn update_id(&self, old_id: &NodeId, new_id: NodeId) -> CacheResult<()> {
        let mut arena = self.write();
        let h = arena.locate(old_id)?;
        if *old_id != new_id {
            if arena.index.contains_key(&new_id) {
                return Err(CacheError::DuplicateId(new_id));
            }
            arena.index.remove(old_id);
            arena.index.insert(new_id, h);
            if let Some(slot) = arena.slot_mut(h) {
                slot.id = new_id;
            }
        }
        arena.dirty.insert(h);
        arena.adopt_orphans(new_id);
        arena.prune_roots();
        debug!(old = %old_id.short_id(), new = %new_id.short_id(), "remapped node id");
        Ok(())
    }

    /// Change a node's value. `unchanged` nodes become `modified`; `new` and
    /// `deleted` nodes keep their state.
    pub fn modify_node(&self, id: &NodeId, value: V) -> CacheResult<()> {
        let mut arena = self.write();
        let h = arena.locate(id)?;
        if let Some(slot) = arena.slot_mut(h) {
            slot.value = value;
            if slot.state == ChangeState::Unchanged {
                slot.state = ChangeState::Modified;
            }
        }
        arena.dirty.insert(h);
        debug!(node = %id.short_id(), "modified cache node");
        Ok(())
    }

    /// Delete a node and its subtree.
    ///
    /// A `new` node was never applied, so it and its whole subtree simply
    /// vanish from the cache. Otherwise the node and its descendants are
    /// marked deleted, except descendants still in state `new`, which are
    /// removed the same way.
    pub fn delete_node(&self, id: &NodeId) -> CacheResult<()> {
        let mut arena = self.write();
        let h = arena.locate(id)?;
        let is_new = arena.slot(h).is_some_and(|s| s.state == ChangeState::New);

        if is_new {
            let purged = arena.purge(h);
            debug!(node = %id.short_id(), purged, "discarded unapplied subtree");
        } else {
            let (marked, purged) = arena.mark_deleted(h);
            debug!(node = %id.short_id(), marked, purged, "marked subtree deleted");
        }
        arena.prune_roots();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Bulk operations
    // ---------------------------------------------------------------

    /// Drop every node and pending change.
    pub fn clear(&self) {
        let mut arena = self.write();
        *arena = Arena::new();
        debug!("cleared change cache");
    }

    /// Mark every pending node `unchanged` and empty the dirty set.
    ///
    /// Deleted flags are kept: applied deletions stay visible in the cache.
    pub fn reset_states_to_unchanged(&self) {
        let mut arena = self.write();
        let dirty: Vec<Handle> = arena.dirty.drain().collect();
        for h in &dirty {
            if let Some(slot) = arena.slot_mut(*h) {
                slot.state = ChangeState::Unchanged;
            }
        }
        debug!(reset = dirty.len(), "reset pending states");
    }

    /// Replace the whole cache with `forest`.
    ///
    /// Dirty membership is derived from each record's state. Records whose
    /// id already appeared earlier in the forest are skipped with their
    /// subtrees.
    pub fn restore(&self, forest: Vec<CacheTree<V>>) {
        let mut arena = Arena::new();
        let mut stack: Vec<(CacheTree<V>, Option<Handle>)> =
            forest.into_iter().rev().map(|t| (t, None)).collect();

        while let Some((mut record, parent)) = stack.pop() {
            if arena.index.contains_key(&record.id) {
                warn!(node = %record.id, "duplicate node id in cache snapshot, skipping subtree");
                continue;
            }
            let children = std::mem::take(&mut record.children);
            let mut slot = Slot::new(record.id, record.value.clone(), record.state);
            slot.is_deleted = record.is_deleted;
            let h = arena.alloc(slot);
            match parent {
                Some(p) => {
                    if let Some(parent_slot) = arena.slot_mut(p) {
                        parent_slot.children.push(h);
                    }
                    if let Some(slot) = arena.slot_mut(h) {
                        slot.parent = Some(p);
                    }
                }
                None => {
                    arena.roots.push(h);
                    if let Some(slot) = arena.slot_mut(h) {
                        slot.expected_parent_id = record.expected_parent_id;
                    }
                }
            }
            if record.state.is_pending() {
                arena.dirty.insert(h);
            }
            stack.extend(children.into_iter().rev().map(|c| (c, Some(h))));
        }

        debug!(nodes = arena.index.len(), dirty = arena.dirty.len(), "restored change cache");
        *self.write() = arena;
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Look up a cached node.
    pub fn find_node(&self, id: &NodeId) -> Option<CacheNode<V>> {
        let arena = self.read();
        arena.lookup(id).and_then(|h| arena.view(h))
    }

    /// Every cached node, parents before children.
    pub fn all_nodes(&self) -> Vec<CacheNode<V>> {
        let arena = self.read();
        arena
            .preorder()
            .into_iter()
            .filter_map(|h| arena.view(h))
            .collect()
    }

    /// The dirty set: nodes with a pending change, parents before children.
    pub fn all_modified(&self) -> Vec<CacheNode<V>> {
        let arena = self.read();
        arena
            .preorder()
            .into_iter()
            .filter(|h| arena.dirty.contains(h))
            .filter_map(|h| arena.view(h))
            .collect()
    }

    /// Nodes in state `deleted` or carrying the deleted flag.
    pub fn all_deleted(&self) -> Vec<CacheNode<V>> {
        let arena = self.read();
        arena
            .preorder()
            .into_iter()
            .filter(|h| {
                arena
                    .slot(*h)
                    .is_some_and(|s| s.state == ChangeState::Deleted || s.is_deleted)
            })
            .filter_map(|h| arena.view(h))
            .collect()
    }

    /// Ids of the dirty nodes in parent-before-child order.
    ///
    /// Applying in this order guarantees that a `new` node's parent has
    /// already been given its permanent id.
    pub fn pending_order(&self) -> Vec<NodeId> {
        let arena = self.read();
        arena
            .preorder()
            .into_iter()
            .filter(|h| arena.dirty.contains(h))
            .filter_map(|h| arena.slot(h).map(|s| s.id))
            .collect()
    }

    /// Ids of the root list, orphans included.
    pub fn root_ids(&self) -> Vec<NodeId> {
        let arena = self.read();
        arena
            .roots
            .iter()
            .filter_map(|h| arena.slot(*h).map(|s| s.id))
            .collect()
    }

    /// Number of cached nodes.
    pub fn len(&self) -> usize {
        self.read().index.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.read().index.is_empty()
    }

    /// Returns `true` if any change is waiting to be applied.
    pub fn has_pending(&self) -> bool {
        !self.read().dirty.is_empty()
    }

    /// Export the cache as nested records.
    pub fn export(&self) -> Vec<CacheTree<V>> {
        let arena = self.read();
        arena.export_forest(&arena.roots)
    }
}

impl<V: Clone + fmt::Display> ChangeCache<V> {
    /// Export the cache for rendering. Deleted nodes stay in the view,
    /// flagged with [`VisualState::Deleted`].
    pub fn display_forest(&self) -> Vec<DisplayNode> {
        let arena = self.read();
        let mut entries = Vec::with_capacity(arena.index.len());
        let mut stack: Vec<(Handle, Option<usize>)> =
            arena.roots.iter().rev().map(|h| (*h, None)).collect();

        while let Some((h, parent)) = stack.pop() {
            let Some(slot) = arena.slot(h) else {
                continue;
            };
            let position = entries.len();
            entries.push((
                parent,
                DisplayNode::new(
                    slot.id,
                    slot.value.to_string(),
                    VisualState::for_cache(slot.state, slot.is_deleted),
                ),
            ));
            stack.extend(slot.children.iter().rev().map(|c| (*c, Some(position))));
        }

        assemble(entries)
    }
}

impl<V: Clone> Default for ChangeCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for ChangeCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ChangeCache");
        match self.inner.read() {
            Ok(arena) => s
                .field("node_count", &arena.index.len())
                .field("root_count", &arena.roots.len())
                .field("dirty_count", &arena.dirty.len()),
            Err(_) => s.field("poisoned", &true),
        };
        s.finish()
    }
}
