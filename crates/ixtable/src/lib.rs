//! ixtable - an embedded, in-memory indexed table library.
//!
//! This crate re-exports the engine from `ixtable-core`: a schema-driven
//! [`Table`] backed by a B+tree for equality/range/unique lookups, a
//! generalized suffix tree for substring search, and a prefix index for
//! `startsWith` search.
//!
//! ```
//! use ixtable::{Column, Schema, Table, TableConfig, Variant};
//! use std::collections::BTreeMap;
//!
//! #[derive(Clone)]
//! struct User {
//!     id: u32,
//!     name: String,
//! }
//!
//! let schema = Schema::new("users", 1, vec![
//!     Column::primary("_id"),
//!     Column::new("name").with_unique().with_sortable(),
//! ]);
//!
//! let mut table: Table<User> = Table::new(
//!     TableConfig::new(),
//!     schema,
//!     |row: &User, _for_index: bool| {
//!         let mut map = BTreeMap::new();
//!         map.insert("name".to_string(), Variant::from(row.name.as_str()));
//!         map
//!     },
//!     |map: &BTreeMap<String, Variant>| User {
//!         id: 0,
//!         name: map.get("name").and_then(Variant::as_text).unwrap_or_default().to_string(),
//!     },
//! );
//!
//! let id = table.next_id();
//! table.insert(id, User { id, name: "alice".to_string() }).unwrap();
//! assert_eq!(table.get(id).unwrap().unwrap().name, "alice");
//! ```

pub use ixtable_core::{
    btree, error, prefix, query, schema, sort, suffix, table, variant, Column, Criterion, Dir,
    Error, Limit, Op, Result, Schema, SortBy, Table, TableConfig, Variant,
};
