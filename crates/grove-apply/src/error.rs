use grove_cache::CacheError;
use grove_store::StoreError;
use grove_types::NodeId;

/// Errors from moving nodes between the store and the cache.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// A new node's parent is not known to the store.
    #[error("parent {parent} of node {node} is not in the store")]
    StructuralConflict { node: NodeId, parent: NodeId },

    /// The node was skipped because creating an ancestor failed.
    #[error("node {node} skipped: creating ancestor {ancestor} failed")]
    AncestorFailed { node: NodeId, ancestor: NodeId },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type ApplyResult<T> = Result<T, ApplyError>;
