/// Errors from encoding snapshots.
///
/// Decoding never fails loudly; see [`SnapshotCodec`](crate::SnapshotCodec).
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("forest is {depth} levels deep, snapshots hold at most {max}")]
    TooDeep { depth: usize, max: usize },
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
