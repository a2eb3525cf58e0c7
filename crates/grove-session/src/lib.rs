//! Editor sessions for Grove.
//!
//! A [`Session`] owns one authoritative [`TreeStore`] and one
//! [`ChangeCache`], and wires them to the snapshot codec, the seed
//! generator, and the apply protocol. It is the main entry point for
//! applications embedding Grove.

pub mod config;
pub mod error;
pub mod session;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use session::Session;

// Re-export key types
pub use grove_apply::{ApplyError, ApplyFailure, ApplyReport};
pub use grove_cache::{CacheNode, ChangeCache};
pub use grove_snapshot::{Codec, SeedConfig, SnapshotConfig};
pub use grove_store::TreeStore;
pub use grove_types::{flatten, ChangeState, DisplayNode, DisplayRow, NodeId, VisualState};
