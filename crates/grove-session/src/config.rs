use serde::{Deserialize, Serialize};

use grove_snapshot::{SeedConfig, SnapshotConfig};

use crate::error::{SessionError, SessionResult};

/// Configuration for a [`Session`](crate::Session).
///
/// Every field has a default, so an empty TOML document is valid:
///
/// ```toml
/// [seed]
/// default_nodes = 500
///
/// [snapshot]
/// codec = "bincode"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Shape of the fallback forest.
    pub seed: SeedConfig,
    /// How snapshots are written and read.
    pub snapshot: SnapshotConfig,
}

impl SessionConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> SessionResult<Self> {
        toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> SessionResult<String> {
        toml::to_string(self).map_err(|e| SessionError::Config(e.to_string()))
    }
}
