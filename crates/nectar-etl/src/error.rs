//! Error types for pipeline runs.

use thiserror::Error;

use nectar_catalog::CatalogError;
use nectar_core::SessionError;

use crate::orchestrator::Phase;
use crate::quality::QualityCheck;

/// Result type alias for ETL operations.
pub type EtlResult<T> = Result<T, EtlError>;

#[derive(Debug, Error)]
pub enum EtlError {
    /// A statement failed; the rest of the phase was not run.
    #[error("{phase} failed on table {table}: {source}")]
    Statement {
        table: String,
        phase: Phase,
        source: SessionError,
    },

    /// A post-transform invariant does not hold.
    #[error("data quality check '{check}' failed: {detail}")]
    DataQuality { check: QualityCheck, detail: String },

    #[error("data quality check '{check}' could not run: {source}")]
    QualityQuery {
        check: QualityCheck,
        source: SessionError,
    },

    /// A staging table has no configured source. Raised before any
    /// statement of the phase runs.
    #[error("{phase} failed on table {table}: no source location configured")]
    MissingSource { table: String, phase: Phase },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
