use grove_types::NodeId;

/// Errors from tree store operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The referenced node is not in the store.
    #[error("node not found: {0}")]
    NotFound(NodeId),

    /// The referenced node, or one of its ancestors, is deleted.
    #[error("node is deleted: {0}")]
    Deleted(NodeId),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
