//! Trees that own their children by value.
//!
//! Display trees and snapshot records share one shape: every node holds a
//! `Vec` of child nodes. The helpers here build, measure, and tear down such
//! trees with explicit worklists, so depth is limited by memory rather than
//! by the call stack.

use crate::id::NodeId;

/// A node that owns its children in a `Vec<Self>`.
pub trait Nested: Sized {
    fn id(&self) -> NodeId;
    fn children(&self) -> &[Self];
    fn children_mut(&mut self) -> &mut Vec<Self>;
}

/// Assemble trees from pre-order `entries`.
///
/// Each entry carries the position of its parent within `entries`; a parent
/// must precede its children. Entries without a valid parent become roots.
/// Child order follows entry order.
pub fn assemble<T: Nested>(entries: Vec<(Option<usize>, T)>) -> Vec<T> {
    let mut slots: Vec<(Option<usize>, Option<T>)> =
        entries.into_iter().map(|(p, n)| (p, Some(n))).collect();
    let mut roots = Vec::new();

    for i in (0..slots.len()).rev() {
        let parent = slots[i].0.filter(|&p| p < i);
        let Some(mut node) = slots[i].1.take() else {
            continue;
        };
        // Children were attached last-first.
        node.children_mut().reverse();
        match parent.and_then(|p| slots[p].1.as_mut()) {
            Some(parent_node) => parent_node.children_mut().push(node),
            None => roots.push(node),
        }
    }

    roots.reverse();
    roots
}

/// Number of levels in `forest`. A lone root has depth 1; an empty forest
/// has depth 0.
pub fn depth<T: Nested>(forest: &[T]) -> usize {
    let mut deepest = 0;
    let mut stack: Vec<(&T, usize)> = forest.iter().map(|n| (n, 1)).collect();
    while let Some((node, level)) = stack.pop() {
        deepest = deepest.max(level);
        stack.extend(node.children().iter().map(|c| (c, level + 1)));
    }
    deepest
}

/// Drop everything in `children` one node at a time.
///
/// Meant for `Drop` impls: the generated drop glue recurses once per level.
pub fn dismantle<T: Nested>(children: &mut Vec<T>) {
    let mut stack = std::mem::take(children);
    while let Some(mut node) = stack.pop() {
        stack.append(node.children_mut());
    }
}
