use std::fmt;

use serde::{Deserialize, Serialize};

/// Pending-edit state of a cache node relative to the authoritative store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeState {
    /// Mirrors the store; nothing to apply.
    #[default]
    Unchanged,
    /// Created in the cache and never applied; its id is synthetic.
    New,
    /// Value edited since it was mirrored from the store.
    Modified,
    /// Logically deleted in the cache, awaiting apply.
    Deleted,
}

impl ChangeState {
    /// Returns `true` if this state carries an edit that Apply must push.
    pub fn is_pending(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::New => write!(f, "new"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Presentation state handed to a renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualState {
    #[default]
    Normal,
    New,
    Modified,
    Deleted,
}

impl VisualState {
    /// Visual state of a cache node. A deleted flag wins over the edit state,
    /// so nodes stay flagged after their deletion has been applied.
    pub fn for_cache(state: ChangeState, is_deleted: bool) -> Self {
        if is_deleted {
            Self::Deleted
        } else {
            state.into()
        }
    }
}

impl From<ChangeState> for VisualState {
    fn from(state: ChangeState) -> Self {
        match state {
            ChangeState::Unchanged => Self::Normal,
            ChangeState::New => Self::New,
            ChangeState::Modified => Self::Modified,
            ChangeState::Deleted => Self::Deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unchanged_is_not_pending() {
        assert!(!ChangeState::Unchanged.is_pending());
        assert!(ChangeState::New.is_pending());
        assert!(ChangeState::Modified.is_pending());
        assert!(ChangeState::Deleted.is_pending());
    }

    #[test]
    fn wire_names_are_lowercase() {
        let json = serde_json::to_string(&ChangeState::Modified).unwrap();
        assert_eq!(json, "\"modified\"");
        let state: ChangeState = serde_json::from_str("\"deleted\"").unwrap();
        assert_eq!(state, ChangeState::Deleted);
    }

    #[test]
    fn deleted_flag_overrides_edit_state() {
        assert_eq!(
            VisualState::for_cache(ChangeState::Unchanged, true),
            VisualState::Deleted
        );
        assert_eq!(
            VisualState::for_cache(ChangeState::Modified, false),
            VisualState::Modified
        );
        assert_eq!(
            VisualState::for_cache(ChangeState::Unchanged, false),
            VisualState::Normal
        );
    }

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(ChangeState::New.to_string(), "new");
        assert_eq!(ChangeState::Unchanged.to_string(), "unchanged");
    }
}
