//! Ordered index backed by an arena B+tree.

mod node;
mod tree;

pub use tree::{BTree, LeafCursor};
