//! Foundation types for Grove, an embedded tree store backing an editor.
//!
//! Every other Grove crate depends on `grove-types`.
//!
//! # Key Types
//!
//! - [`NodeId`] -- UUID v7 node identifier shared by the store and the cache
//! - [`ChangeState`] -- Pending-edit state of a cache node
//! - [`VisualState`] -- How a node is presented by a renderer
//! - [`DisplayNode`] -- Renderer-facing tree exported by both stores
//! - [`DisplayRow`] -- One leveled row of a flattened display tree
//! - [`Nested`] -- Trees that own their children, with stack-safe helpers

pub mod error;
pub mod id;
pub mod nest;
pub mod state;
pub mod view;

pub use error::TypeError;
pub use id::NodeId;
pub use state::{ChangeState, VisualState};
pub use nest::{assemble, depth, dismantle, Nested};
pub use view::{flatten, DisplayNode, DisplayRow};
