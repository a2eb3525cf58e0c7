//! Moving edits between the Grove tree store and change cache.
//!
//! Nodes flow store → cache through [`transfer`] and [`transfer_subtree`],
//! and pending edits flow back cache → store through [`apply`]:
//!
//! 1. open a store transaction;
//! 2. walk the dirty nodes parents-first, creating, updating, or deleting
//!    the matching store nodes and re-keying newly created cache nodes to
//!    their permanent store ids;
//! 3. commit the transaction, which cascades deletions;
//! 4. reset every cache state to `unchanged`.
//!
//! Per-node failures never abort the run. They are collected in the
//! returned [`ApplyReport`].

pub mod apply;
pub mod error;
pub mod report;
pub mod transfer;

pub use apply::apply;
pub use error::{ApplyError, ApplyResult};
pub use report::{ApplyFailure, ApplyReport};
pub use transfer::{transfer, transfer_subtree};
