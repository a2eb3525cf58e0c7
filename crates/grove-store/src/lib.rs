//! Authoritative tree storage for Grove.
//!
//! [`TreeStore`] holds the committed forest that an editor's change cache is
//! eventually merged into. Nodes are addressed by [`NodeId`] through a
//! location index (the child-index path from a root), giving O(depth) lookup
//! and mutation.
//!
//! # Design Rules
//!
//! 1. Deletion is logical and permanent: nodes are flagged, never removed.
//! 2. A node is *effectively* deleted when it or any ancestor is flagged.
//! 3. Outside a transaction, `delete` cascades the flag immediately. Inside
//!    one, the cascade is deferred to `commit_transaction`.
//! 4. Mutations copy only the root-to-target spine; untouched subtrees are
//!    shared with any outstanding snapshot.
//! 5. Failed calls never leave the store half-modified.
//!
//! [`NodeId`]: grove_types::NodeId

pub mod error;
pub mod node;
pub mod record;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use node::{Forest, TreeNode};
pub use record::{records_to_forest, NodeRecord};
pub use store::TreeStore;
