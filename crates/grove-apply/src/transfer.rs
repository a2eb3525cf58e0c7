//! Copying store nodes into the change cache.

use std::sync::Arc;

use grove_cache::{CacheNode, ChangeCache};
use grove_store::{StoreError, TreeNode, TreeStore};
use grove_types::NodeId;
use tracing::debug;

use crate::error::ApplyResult;

/// Mirror the live store node `id` into the cache under its store parent.
///
/// If the parent is not cached yet the node waits as an orphan. Transferring
/// a node that is already cached re-syncs it and drops its pending edit.
pub fn transfer<V: Clone>(
    store: &TreeStore<V>,
    cache: &ChangeCache<V>,
    id: &NodeId,
) -> ApplyResult<CacheNode<V>> {
    let node = live_node(store, id)?;
    let cached = cache.insert_node(node.id, node.value.clone(), node.parent_id);
    debug!(node = %id.short_id(), "transferred node");
    Ok(cached)
}

/// Transfer the live subtree rooted at `id`, parents first.
///
/// Returns the transferred ids in pre-order. Deleted descendants and their
/// subtrees are skipped.
pub fn transfer_subtree<V: Clone>(
    store: &TreeStore<V>,
    cache: &ChangeCache<V>,
    id: &NodeId,
) -> ApplyResult<Vec<NodeId>> {
    let root = live_node(store, id)?;
    let mut transferred = Vec::new();
    let mut stack: Vec<&TreeNode<V>> = vec![root.as_ref()];

    while let Some(node) = stack.pop() {
        if node.is_deleted {
            continue;
        }
        cache.insert_node(node.id, node.value.clone(), node.parent_id);
        transferred.push(node.id);
        stack.extend(node.children.iter().rev().map(|c| c.as_ref()));
    }

    debug!(root = %id.short_id(), count = transferred.len(), "transferred subtree");
    Ok(transferred)
}

fn live_node<V: Clone>(
    store: &TreeStore<V>,
    id: &NodeId,
) -> Result<Arc<TreeNode<V>>, StoreError> {
    match store.get_non_deleted(id) {
        Some(node) => Ok(node),
        None if store.get(id).is_some() => Err(StoreError::Deleted(*id)),
        None => Err(StoreError::NotFound(*id)),
    }
}
