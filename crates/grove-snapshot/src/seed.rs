//! Random seed forests.

use std::sync::Arc;

use rand::Rng;
use tracing::debug;
use uuid::Builder;

use grove_store::{Forest, TreeNode};
use grove_types::NodeId;

use crate::config::SeedConfig;

/// Generate a single-root forest of `nodes` nodes (clamped by `config`).
///
/// The root holds `config.root_title`; every other node is titled
/// `Node <8 hex digits>` and hangs under a parent drawn uniformly from a
/// candidate pool. The pool starts with the root, and each generated node
/// joins it with probability `config.branch_probability`.
///
/// Ids are drawn from `rng`, so a seeded generator yields a reproducible
/// forest.
pub fn generate_forest<R: Rng + ?Sized>(
    config: &SeedConfig,
    nodes: Option<usize>,
    rng: &mut R,
) -> Forest<String> {
    let total = config.node_count(nodes);
    if total == 0 {
        return Vec::new();
    }

    // Flat layout first: parents always precede their children.
    let mut ids = Vec::with_capacity(total);
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(total);
    let mut values = Vec::with_capacity(total);
    let mut children: Vec<Vec<usize>> = Vec::with_capacity(total);
    let mut candidates = vec![0];

    ids.push(random_id(rng));
    parents.push(None);
    values.push(config.root_title.clone());
    children.push(Vec::new());

    while ids.len() < total {
        let index = ids.len();
        let parent = candidates[rng.gen_range(0..candidates.len())];
        ids.push(random_id(rng));
        parents.push(Some(parent));
        values.push(format!("Node {:08x}", rng.gen::<u32>()));
        children.push(Vec::new());
        children[parent].push(index);
        if rng.gen::<f64>() < config.branch_probability {
            candidates.push(index);
        }
    }

    // Build bottom-up so every child is finished before its parent.
    let mut built: Vec<Option<Arc<TreeNode<String>>>> = vec![None; total];
    for index in (0..total).rev() {
        let parent_id = parents[index].map(|p| ids[p]);
        let mut node = TreeNode::new(ids[index], parent_id, std::mem::take(&mut values[index]));
        node.children = children[index]
            .iter()
            .filter_map(|c| built[*c].take())
            .collect();
        built[index] = Some(Arc::new(node));
    }

    debug!(nodes = total, candidates = candidates.len(), "generated seed forest");
    built[0].take().into_iter().collect()
}

/// The forest used when no snapshot is available.
pub fn default_forest(config: &SeedConfig) -> Forest<String> {
    generate_forest(config, None, &mut rand::thread_rng())
}

fn random_id<R: Rng + ?Sized>(rng: &mut R) -> NodeId {
    NodeId::from_uuid(Builder::from_random_bytes(rng.gen()).into_uuid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_store::TreeStore;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn walk(forest: &Forest<String>) -> Vec<&TreeNode<String>> {
        let mut out = Vec::new();
        let mut stack: Vec<&TreeNode<String>> = forest.iter().map(|r| r.as_ref()).collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().map(|c| c.as_ref()));
        }
        out
    }

    #[test]
    fn default_forest_has_ten_nodes_under_root() {
        let forest = default_forest(&SeedConfig::default());
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].value, "Root");
        assert!(forest[0].parent_id.is_none());
        assert_eq!(forest[0].subtree_len(), 10);
    }

    #[test]
    fn titles_follow_generator_pattern() {
        let mut rng = StdRng::seed_from_u64(7);
        let forest = generate_forest(&SeedConfig::default(), Some(50), &mut rng);
        for node in walk(&forest).into_iter().skip(1) {
            let hex = node.value.strip_prefix("Node ").unwrap();
            assert_eq!(hex.len(), 8);
            assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn same_seed_same_forest() {
        let config = SeedConfig::default();
        let a = generate_forest(&config, Some(200), &mut StdRng::seed_from_u64(42));
        let b = generate_forest(&config, Some(200), &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn zero_branch_probability_gives_flat_tree() {
        let config = SeedConfig {
            branch_probability: 0.0,
            ..Default::default()
        };
        let forest = generate_forest(&config, Some(30), &mut StdRng::seed_from_u64(1));
        assert_eq!(forest[0].children.len(), 29);
        assert!(forest[0].children.iter().all(|c| c.children.is_empty()));
    }

    #[test]
    fn generated_forest_loads_into_store() {
        let forest = generate_forest(&SeedConfig::default(), Some(100), &mut StdRng::seed_from_u64(3));
        let store = TreeStore::from_forest(forest);
        assert_eq!(store.len(), 100);
        assert_eq!(store.display_forest().len(), 1);
    }

    proptest! {
        #[test]
        fn shape_is_consistent(seed in any::<u64>(), requested in 0usize..400) {
            let config = SeedConfig::default();
            let forest = generate_forest(&config, Some(requested), &mut StdRng::seed_from_u64(seed));
            let nodes = walk(&forest);

            prop_assert_eq!(forest.len(), 1);
            prop_assert_eq!(nodes.len(), config.node_count(Some(requested)));
            for node in &nodes {
                prop_assert!(!node.is_deleted);
                for child in &node.children {
                    prop_assert_eq!(child.parent_id, Some(node.id));
                }
            }
        }
    }
}
