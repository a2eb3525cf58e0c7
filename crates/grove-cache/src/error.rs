//! Error types for the change cache.

use grove_types::NodeId;

/// Errors from change cache operations.
///
/// A failed call leaves the cache untouched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The referenced node is not in the cache.
    #[error("node not in cache: {0}")]
    NotFound(NodeId),

    /// A re-key would collide with a node already in the cache.
    #[error("node id already in cache: {0}")]
    DuplicateId(NodeId),
}

/// Convenience alias for cache results.
pub type CacheResult<T> = Result<T, CacheError>;
