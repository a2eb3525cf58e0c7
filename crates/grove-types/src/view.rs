//! Renderer-facing display trees.
//!
//! Both stores export their forests as [`DisplayNode`] trees on demand. A
//! renderer typically consumes the result of [`flatten`], a pre-order list of
//! leveled rows limited to the expanded part of the tree.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::nest::{dismantle, Nested};
use crate::state::VisualState;

/// A node of an exported display tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayNode {
    pub id: NodeId,
    /// Human-readable rendering of the node's value.
    pub title: String,
    pub state: VisualState,
    pub children: Vec<DisplayNode>,
}

impl DisplayNode {
    /// Create a leaf display node.
    pub fn new(id: NodeId, title: impl Into<String>, state: VisualState) -> Self {
        Self {
            id,
            title: title.into(),
            state,
            children: Vec::new(),
        }
    }

    /// Find a node by id anywhere in `forest`.
    pub fn find<'a>(forest: &'a [DisplayNode], id: &NodeId) -> Option<&'a DisplayNode> {
        let mut stack: Vec<&DisplayNode> = forest.iter().collect();
        while let Some(node) = stack.pop() {
            if node.id == *id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    /// Total number of nodes in `forest`.
    pub fn count(forest: &[DisplayNode]) -> usize {
        let mut stack: Vec<&DisplayNode> = forest.iter().collect();
        let mut total = 0;
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.children.iter());
        }
        total
    }
}

impl Nested for DisplayNode {
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

impl Drop for DisplayNode {
    fn drop(&mut self) {
        dismantle(&mut self.children);
    }
}

/// One row of a flattened display tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRow {
    /// Depth below the forest roots (roots are level 0).
    pub level: usize,
    pub id: NodeId,
    pub title: String,
    pub state: VisualState,
    /// Whether the node has children, expanded or not.
    pub has_children: bool,
}

/// Flatten `forest` into pre-order rows, descending only into nodes for
/// which `is_expanded` returns `true`.
pub fn flatten<F>(forest: &[DisplayNode], is_expanded: F) -> Vec<DisplayRow>
where
    F: Fn(&NodeId) -> bool,
{
    let mut rows = Vec::new();
    let mut stack: Vec<(&DisplayNode, usize)> = forest.iter().rev().map(|n| (n, 0)).collect();

    while let Some((node, level)) = stack.pop() {
        rows.push(DisplayRow {
            level,
            id: node.id,
            title: node.title.clone(),
            state: node.state,
            has_children: !node.children.is_empty(),
        });
        if is_expanded(&node.id) {
            stack.extend(node.children.iter().rev().map(|c| (c, level + 1)));
        }
    }

    rows
}
