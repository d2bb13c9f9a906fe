//! Error types for the table catalog.

use thiserror::Error;

use crate::spec::Tier;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while validating or resolving a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// A selector named a table the catalog does not declare.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("table {0} is declared more than once")]
    DuplicateTable(String),

    #[error("physical table {physical} is used by both {first} and {second}")]
    DuplicatePhysicalName {
        physical: String,
        first: String,
        second: String,
    },

    /// A transform reads a table at the same or a higher tier.
    #[error("{table} ({tier}) reads {reads} ({read_tier}); transforms may only read lower tiers")]
    InvalidDependency {
        table: String,
        tier: Tier,
        reads: String,
        read_tier: Tier,
    },

    #[error("{table} reads {reads}, which is not in the catalog")]
    UndeclaredInput { table: String, reads: String },

    #[error("{table} ({tier}) declares a {kind} statement, which its tier does not allow")]
    MisplacedStatement {
        table: String,
        tier: Tier,
        kind: &'static str,
    },

    /// A staging table has a load statement but no source location.
    #[error("no source location configured for {0}")]
    MissingSource(String),
}
