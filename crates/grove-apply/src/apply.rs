//! The apply protocol.

use std::collections::HashMap;

use grove_cache::{CacheNode, ChangeCache};
use grove_store::{StoreError, TreeStore};
use grove_types::{ChangeState, NodeId};
use tracing::{debug, warn};

use crate::error::{ApplyError, ApplyResult};
use crate::report::{ApplyFailure, ApplyReport};

/// Merge every pending cache edit into `store`.
///
/// Dirty nodes are processed parents-first, so a `new` child is always
/// created after its `new` parent has received its permanent id. A `new`
/// orphan is created under its expected parent when the store knows that
/// parent, and as a store root otherwise.
///
/// Failures are recorded per node and never roll back edits that already
/// went through. When creating a node fails, its `new` descendants are
/// skipped with [`ApplyError::AncestorFailed`].
pub fn apply<V: Clone>(store: &TreeStore<V>, cache: &ChangeCache<V>) -> ApplyReport {
    let mut report = ApplyReport::default();
    // Failed creations, mapped to the ancestor whose creation failed first.
    let mut failed: HashMap<NodeId, NodeId> = HashMap::new();

    store.start_transaction();

    for id in cache.pending_order() {
        let Some(node) = cache.find_node(&id) else {
            continue;
        };
        let state = node.state;
        let outcome = match state {
            ChangeState::New => match node.parent_id.and_then(|p| failed.get(&p).copied()) {
                Some(ancestor) => Err(ApplyError::AncestorFailed { node: id, ancestor }),
                None => create(store, cache, node).map(|new_id| {
                    report.created.push((id, new_id));
                }),
            },
            ChangeState::Modified => store
                .update_value(&id, node.value)
                .map(|()| report.updated.push(id))
                .map_err(ApplyError::from),
            ChangeState::Deleted => store
                .delete(&id)
                .map(|()| report.deleted.push(id))
                .map_err(ApplyError::from),
            ChangeState::Unchanged => Ok(()),
        };

        if let Err(error) = outcome {
            warn!(node = %id, %state, %error, "pending edit not applied");
            if state == ChangeState::New {
                let ancestor = match &error {
                    ApplyError::AncestorFailed { ancestor, .. } => *ancestor,
                    _ => id,
                };
                failed.insert(id, ancestor);
            }
            report.failures.push(ApplyFailure { id, state, error });
        }
    }

    store.commit_transaction();
    cache.reset_states_to_unchanged();

    debug!(
        created = report.created.len(),
        updated = report.updated.len(),
        deleted = report.deleted.len(),
        failed = report.failures.len(),
        "apply finished"
    );
    report
}

/// Create the store counterpart of a `new` cache node and re-key the cache
/// node to the permanent id.
///
/// An orphan goes under its expected parent if the store knows that parent
/// and becomes a store root otherwise.
fn create<V: Clone>(
    store: &TreeStore<V>,
    cache: &ChangeCache<V>,
    node: CacheNode<V>,
) -> ApplyResult<NodeId> {
    let new_id = match (node.parent_id, node.expected_parent_id) {
        (Some(parent), _) => store
            .create_child(&parent, node.value)
            .map_err(|e| match e {
                StoreError::NotFound(_) => ApplyError::StructuralConflict {
                    node: node.id,
                    parent,
                },
                other => ApplyError::Store(other),
            })?,
        (None, Some(expected)) => match store.create_child(&expected, node.value.clone()) {
            Ok(id) => id,
            Err(StoreError::NotFound(_)) => {
                debug!(node = %node.id, parent = %expected, "expected parent unknown, creating root");
                store.create_root(node.value)
            }
            Err(other) => return Err(other.into()),
        },
        (None, None) => store.create_root(node.value),
    };
    cache.update_id(&node.id, new_id)?;
    Ok(new_id)
}
