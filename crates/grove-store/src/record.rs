//! Snapshot records exchanged with a persistence collaborator.
//!
//! Field names follow the on-disk snapshot layout (`parentId`, `isDeleted`).
//! Unknown fields, such as the `"type": "node"` tag written by older data
//! generators, are ignored on import.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use grove_types::{assemble, dismantle, NodeId, Nested};

use crate::node::{Forest, TreeNode};

/// One node of a store snapshot, with its children nested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "V: Deserialize<'de>"))]
pub struct NodeRecord<V> {
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub value: V,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub children: Vec<NodeRecord<V>>,
}

impl<V: Clone> NodeRecord<V> {
    /// Export `roots` and everything below them as nested records.
    pub fn from_forest(roots: &[Arc<TreeNode<V>>]) -> Vec<Self> {
        let mut entries = Vec::new();
        let mut stack: Vec<(&TreeNode<V>, Option<usize>)> =
            roots.iter().rev().map(|r| (r.as_ref(), None)).collect();
        while let Some((node, parent)) = stack.pop() {
            let position = entries.len();
            entries.push((
                parent,
                NodeRecord {
                    id: node.id,
                    parent_id: node.parent_id,
                    value: node.value.clone(),
                    is_deleted: node.is_deleted,
                    children: Vec::new(),
                },
            ));
            stack.extend(node.children.iter().rev().map(|c| (c.as_ref(), Some(position))));
        }
        assemble(entries)
    }
}

impl<V> Nested for NodeRecord<V> {
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

impl<V> Drop for NodeRecord<V> {
    fn drop(&mut self) {
        dismantle(&mut self.children);
    }
}

/// Convert top-level records into a forest.
///
/// Each node's `parent_id` is taken from the nesting, not from the record,
/// so the two can never disagree inside the store.
pub fn records_to_forest<V: Clone>(records: &[NodeRecord<V>]) -> Forest<V> {
    let mut order: Vec<(&NodeRecord<V>, Option<usize>)> = Vec::new();
    let mut stack: Vec<(&NodeRecord<V>, Option<usize>)> =
        records.iter().rev().map(|r| (r, None)).collect();
    while let Some((record, parent)) = stack.pop() {
        let position = order.len();
        order.push((record, parent));
        stack.extend(record.children.iter().rev().map(|c| (c, Some(position))));
    }

    // Build bottom-up so every child is finished before its parent.
    let mut children: Vec<Vec<Arc<TreeNode<V>>>> = vec![Vec::new(); order.len()];
    let mut roots = Vec::new();
    for (position, (record, parent)) in order.iter().enumerate().rev() {
        let mut node = TreeNode::new(record.id, parent.map(|p| order[p].0.id), record.value.clone());
        node.is_deleted = record.is_deleted;
        node.children = std::mem::take(&mut children[position]);
        node.children.reverse();
        match parent {
            Some(p) => children[*p].push(Arc::new(node)),
            None => roots.push(Arc::new(node)),
        }
    }
    roots.reverse();
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_generator_layout() {
        let json = r#"[{
            "type": "node",
            "id": "0b8b2f4e-6f1c-4c59-9a57-3f0d8d1e2a10",
            "parentId": null,
            "value": "Root",
            "isDeleted": false,
            "children": [{
                "type": "node",
                "id": "5d1a8c7e-2b3f-4e6d-8a9b-0c1d2e3f4a5b",
                "parentId": "0b8b2f4e-6f1c-4c59-9a57-3f0d8d1e2a10",
                "value": "Node 1a2b3c4d",
                "isDeleted": true,
                "children": []
            }]
        }]"#;
        let records: Vec<NodeRecord<String>> = serde_json::from_str(json).unwrap();
        let forest = records_to_forest(&records);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].value, "Root");
        let child = &forest[0].children[0];
        assert_eq!(child.parent_id, Some(forest[0].id));
        assert!(child.is_deleted);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{"id": "0b8b2f4e-6f1c-4c59-9a57-3f0d8d1e2a10", "value": "bare"}"#;
        let record: NodeRecord<String> = serde_json::from_str(json).unwrap();
        assert!(record.parent_id.is_none());
        assert!(!record.is_deleted);
        assert!(record.children.is_empty());
    }

    #[test]
    fn nesting_overrides_declared_parent() {
        let record = NodeRecord {
            id: NodeId::new(),
            parent_id: None,
            value: "root",
            is_deleted: false,
            children: vec![NodeRecord {
                id: NodeId::new(),
                parent_id: Some(NodeId::new()),
                value: "child",
                is_deleted: false,
                children: vec![],
            }],
        };
        let forest = records_to_forest(&[record]);
        assert_eq!(forest[0].children[0].parent_id, Some(forest[0].id));
    }

    #[test]
    fn export_uses_camel_case() {
        let node = Arc::new(TreeNode::new(NodeId::new(), None, "v".to_string()));
        let json = serde_json::to_string(&NodeRecord::from_forest(&[node])).unwrap();
        assert!(json.contains("\"parentId\":null"));
        assert!(json.contains("\"isDeleted\":false"));
    }

    #[test]
    fn export_keeps_sibling_order() {
        let mut root = TreeNode::new(NodeId::new(), None, "root".to_string());
        for name in ["a", "b", "c"] {
            root.push_child(TreeNode::new(NodeId::new(), None, name.to_string()));
        }
        let second = Arc::new(TreeNode::new(NodeId::new(), None, "second".to_string()));
        let records = NodeRecord::from_forest(&[Arc::new(root), second]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].value, "second");
        let names: Vec<&str> = records[0].children.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(records[0].children[2].parent_id, Some(records[0].id));
    }

    #[test]
    fn deep_chains_convert_and_drop_without_recursion() {
        const LEVELS: usize = 100_000;
        let mut node = TreeNode::new(NodeId::new(), None, 0usize);
        for level in 1..LEVELS {
            let mut parent = TreeNode::new(NodeId::new(), None, level);
            parent.push_child(node);
            node = parent;
        }
        let forest = vec![Arc::new(node)];

        let records = NodeRecord::from_forest(&forest);
        assert_eq!(grove_types::depth(&records), LEVELS);
        let rebuilt = records_to_forest(&records);
        assert_eq!(rebuilt[0].subtree_len(), LEVELS);
        assert_eq!(rebuilt[0].id, forest[0].id);

        drop(records);
        drop(rebuilt);
    }
}
