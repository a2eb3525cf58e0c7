//! Persistence and seeding for Grove.
//!
//! The core stores own no persisted state. This crate turns their exported
//! records into bytes and back, and builds the random seed forest used when
//! no snapshot is available.
//!
//! Import is forgiving: malformed records are skipped with a warning, and a
//! snapshot that yields nothing usable decodes to `None` ("no data") so the
//! caller can fall back to [`default_forest`].

pub mod codec;
pub mod config;
pub mod error;
pub mod seed;

pub use codec::{SnapshotCodec, MAX_DEPTH};
pub use config::{Codec, SeedConfig, SnapshotConfig};
pub use error::{SnapshotError, SnapshotResult};
pub use seed::{default_forest, generate_forest};
