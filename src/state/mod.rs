//! Tree Store: the in-memory conversation tree and its persisted record.

pub mod persistence;
pub mod tree;

pub use persistence::{StoreError, TreeStore, slugify};
pub use tree::{Node, NodeId, Tree, TreeError, TreeStats, truncate_summary};
