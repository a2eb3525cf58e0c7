use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] grove_store::StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] grove_cache::CacheError),

    #[error("apply error: {0}")]
    Apply(#[from] grove_apply::ApplyError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] grove_snapshot::SnapshotError),
}

pub type SessionResult<T> = Result<T, SessionError>;
