//! nectar-etl: staged pipeline over the table catalog.
//!
//! The [`EtlOrchestrator`] runs drop, create, load and transform phases
//! through a [`Session`](nectar_core::Session), one committed statement at
//! a time. The [`DataQualityGate`] verifies the result.

pub mod error;
pub mod orchestrator;
pub mod postgres;
pub mod quality;

#[cfg(test)]
mod testing;

pub use error::{EtlError, EtlResult};
pub use orchestrator::{
    EtlOrchestrator, LoadContext, OutcomeRecord, Phase, PipelineRun, TableOutcome,
};
pub use self::postgres::{PgConnector, PgSession};
pub use quality::{DataQualityGate, QualityCheck, QualityReport};
