//! Store-side node type and internal locations.

use std::sync::Arc;

use grove_types::NodeId;

/// An ordered sequence of root nodes.
///
/// Subtrees are reference-counted so that snapshots and mutated forests can
/// share every subtree a mutation did not touch.
pub type Forest<V> = Vec<Arc<TreeNode<V>>>;

/// A node of the authoritative forest.
///
/// A parent exclusively owns its children; `parent_id` is informational and
/// mirrors the structural parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode<V> {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub value: V,
    pub is_deleted: bool,
    pub children: Vec<Arc<TreeNode<V>>>,
}

impl<V> TreeNode<V> {
    /// Create a live leaf node.
    pub fn new(id: NodeId, parent_id: Option<NodeId>, value: V) -> Self {
        Self {
            id,
            parent_id,
            value,
            is_deleted: false,
            children: Vec::new(),
        }
    }

    /// Append `child` as the last child, setting its `parent_id`.
    pub fn push_child(&mut self, mut child: TreeNode<V>) {
        child.parent_id = Some(self.id);
        self.children.push(Arc::new(child));
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        let mut stack: Vec<&TreeNode<V>> = vec![self];
        let mut total = 0;
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.children.iter().map(Arc::as_ref));
        }
        total
    }
}

impl<V> Drop for TreeNode<V> {
    fn drop(&mut self) {
        // Unlink uniquely owned descendants iteratively; the default drop
        // recurses once per level.
        let mut stack = std::mem::take(&mut self.children);
        while let Some(child) = stack.pop() {
            if let Some(mut node) = Arc::into_inner(child) {
                stack.append(&mut node.children);
            }
        }
    }
}

/// Child-index path from a root to a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Location(Vec<usize>);

impl Location {
    pub(crate) fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub(crate) fn child(&self, index: usize) -> Self {
        let mut path = Vec::with_capacity(self.0.len() + 1);
        path.extend_from_slice(&self.0);
        path.push(index);
        Self(path)
    }

    pub(crate) fn from_path(path: Vec<usize>) -> Self {
        Self(path)
    }

    pub(crate) fn path(&self) -> &[usize] {
        &self.0
    }

    /// Returns `true` if `self` addresses a strict ancestor of `other`.
    pub(crate) fn is_strict_prefix_of(&self, other: &Location) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_child_sets_parent() {
        let mut root = TreeNode::new(NodeId::new(), None, "root");
        root.push_child(TreeNode::new(NodeId::new(), None, "child"));
        assert_eq!(root.children[0].parent_id, Some(root.id));
        assert_eq!(root.subtree_len(), 2);
    }

    #[test]
    fn strict_prefix() {
        let a = Location::root(0);
        let b = a.child(2);
        let c = b.child(0);
        assert!(a.is_strict_prefix_of(&b));
        assert!(a.is_strict_prefix_of(&c));
        assert!(!b.is_strict_prefix_of(&b));
        assert!(!c.is_strict_prefix_of(&a));
        assert!(!Location::root(1).is_strict_prefix_of(&c));
    }

    #[test]
    fn dropping_a_deep_chain_does_not_overflow() {
        let mut node = TreeNode::new(NodeId::new(), None, 0u32);
        for depth in 1..200_000u32 {
            let mut parent = TreeNode::new(NodeId::new(), None, depth);
            parent.push_child(node);
            node = parent;
        }
        assert_eq!(node.subtree_len(), 200_000);
        drop(node);
    }
}
