//! Core error types.
//!
//! Every variant here corresponds to one of the exact, user-facing error
//! strings a table operation can return. Callers match on the rendered
//! message (via `to_string()`), not on the variant, so the `Display` text
//! is part of the crate's contract and must not drift.

use thiserror::Error;

/// Core table errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A row id of zero was passed to an operation that requires a real id.
    #[error("Invalid id")]
    InvalidId,

    /// `replace` or `delete` targeted an id that was never inserted or was
    /// already tombstoned.
    #[error("Primary key not found: {0}")]
    PrimaryKeyNotFound(u32),

    /// A criterion or sort key referenced a column absent from the schema.
    #[error("Unknown column {0}")]
    UnknownColumn(String),

    /// An operator was requested against a column with no matching index
    /// (e.g. `contains` on a column that is not `partial`).
    #[error("No index found for column {0}")]
    NoIndexForColumn(String),

    /// The criterion value's Variant branch doesn't match what the column's
    /// index expects (e.g. a `text` value against a `between` tuple).
    #[error("Invalid type for column {0}")]
    InvalidTypeForColumn(String),

    /// A non-nullable column's serialized value was `nil`, message variant
    /// used by the `find`/criterion path.
    #[error("Value can't be null on column {0}")]
    ValueCantBeNull(String),

    /// A non-nullable column's serialized value was `nil`, message variant
    /// used by `insert`/`replace` validation.
    #[error("Value can not be null at column {0}")]
    ValueCanNotBeNullAt(String),

    /// A unique column's value collided with an existing row.
    #[error("Duplicated unique key at column {0}")]
    DuplicatedUniqueKey(String),

    /// Any operator other than `eq` was used against `_id`.
    #[error("Unsupported operator for column _id")]
    UnsupportedOperatorForId,

    /// `_id` criterion value was not a `nat32`.
    #[error("Type of column _id must be Nat32")]
    IdMustBeNat32,

    /// `between` was used with a value that isn't a `tuple`.
    #[error("Value should be a tuple for column {0}")]
    ValueShouldBeTuple(String),

    /// `min` bound violated for a numeric column.
    #[error("{0} must be at least {1}")]
    MustBeAtLeast(String, String),

    /// `max` bound violated for a numeric column.
    #[error("{0} must be at most {1}")]
    MustBeAtMost(String, String),

    /// `min` bound violated for a text column (length, not value).
    #[error("{0} must be at least {1} long")]
    MustBeAtLeastLong(String, usize),

    /// `max` bound violated for a text column (length, not value).
    #[error("{0} must be at most {1} long")]
    MustBeAtMostLong(String, usize),

    /// `min` bound violated for an array column (element count).
    #[error("{0} must have at least {1} elements")]
    MustHaveAtLeastElements(String, usize),

    /// `max` bound violated for an array column (element count).
    #[error("{0} must have at most {1} elements")]
    MustHaveAtMostElements(String, usize),

    /// A non-nullable column was missing from the serialized map entirely.
    #[error("{0} can't be null")]
    ColumnCantBeNull(String),

    /// Equality filtering for `nil` against a unique index. Not
    /// implemented: a unique index holds at most one `nil` row, and
    /// resolving it would need the null bucket wired into the eq path.
    #[error("Isnull not implemented for unique indexes")]
    IsNullNotImplementedForUniqueIndexes,

    /// Every validation failure from a single `insert`/`replace`, joined
    /// with a comma, rather than stopping at the first one.
    #[error("{0}")]
    Validation(String),

    /// An internal invariant that the table engine believes unreachable
    /// was violated. In debug builds the originating call site also fires
    /// a `debug_assert!`; in release builds this is returned instead of
    /// panicking.
    #[error("bug: {0}")]
    Bug(String),
}

/// Panic in debug builds (surfacing the broken invariant immediately),
/// but return a catchable [`Error::Bug`] in release builds so an embedding
/// host doesn't go down over a structural invariant that "can't happen".
pub(crate) fn bug(message: impl Into<String>) -> Error {
    let message = message.into();
    debug_assert!(false, "ixtable bug: {message}");
    Error::Bug(message)
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
