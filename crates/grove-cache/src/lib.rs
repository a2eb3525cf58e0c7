//! Shadow change cache for Grove.
//!
//! [`ChangeCache`] mirrors part of the authoritative store and accumulates
//! edits (creations, value changes, logical deletes) until they are applied.
//! Nodes may arrive in any order: a node whose parent is not cached yet is
//! held as a root *orphan* and adopted as soon as the parent shows up.
//!
//! # Key Types
//!
//! - [`ChangeCache`] -- the cache itself, behind a lock
//! - [`CacheNode`] -- read-only view of one cached node
//! - [`CacheTree`] -- nested record used for persistence and restore

pub mod cache;
pub mod error;
pub mod node;

pub use cache::ChangeCache;
pub use error::{CacheError, CacheResult};
pub use node::{CacheNode, CacheTree};
