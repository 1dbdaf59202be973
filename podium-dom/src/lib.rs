#![warn(clippy::all, rust_2018_idioms)]
//! Snapshot model of the embedded chat document.
//!
//! The host captures the live page as an immutable [`DomSnapshot`]; everything
//! downstream (selector resolution, message extraction, alert scanning) reads
//! from one snapshot at a time and never holds on to nodes across captures.

mod mutation;
mod node;
mod selector;
mod snapshot;

pub use mutation::{diff_snapshots, DomMutation, MutationBatch};
pub use node::{DomNode, ElementBuilder, NodeId, NodeKind, RawNode};
pub use selector::{Selector, SelectorError};
pub use snapshot::{DomSnapshot, SnapshotError};
