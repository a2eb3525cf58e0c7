use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid node id {input:?}: {reason}")]
    InvalidNodeId { input: String, reason: String },
}
