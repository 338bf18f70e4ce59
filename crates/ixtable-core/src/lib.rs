//! ixtable-core - in-memory row storage with B+tree, suffix-tree, and
//! prefix secondary indexes.
//!
//! This crate provides the indexed [`table::Table`] engine: schema-driven
//! validation, uniqueness enforcement, equality/range/substring/prefix
//! lookups, and backup/restore, all over an arena-based B+tree keyed by
//! [`variant::Variant`].

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod btree;
pub mod error;
pub mod prefix;
pub mod query;
pub mod schema;
pub mod sort;
pub mod suffix;
pub mod table;
pub mod variant;

pub use error::{Error, Result};
pub use query::{Criterion, Dir, Limit, Op, SortBy};
pub use schema::{Column, Schema};
pub use table::{Table, TableConfig};
pub use variant::Variant;
