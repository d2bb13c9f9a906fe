//! EtlOrchestrator: runs drop, create, load and transform phases over a
//! catalog selection.
//!
//! Each phase walks the resolved specs in catalog order and commits every
//! statement before running the next. There is no transaction spanning a
//! phase: a failure stops the phase and leaves earlier tables committed.
//! Recovery is a fresh drop, create, load and transform.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, error, info};

use nectar_catalog::{Catalog, TableSelector, TableSpec, Tier};
use nectar_core::{Session, SessionError};

use crate::error::{EtlError, EtlResult};

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Drop,
    Create,
    Load,
    Transform,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Drop => "drop",
            Phase::Create => "create",
            Phase::Load => "load",
            Phase::Transform => "transform",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one table in one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Succeeded,
    /// The table declares no statement for the phase.
    Skipped,
    Failed(String),
}

/// One table's outcome in one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub phase: Phase,
    pub table: String,
    pub outcome: TableOutcome,
}

/// State of one orchestrator invocation: the selection, the phase being
/// executed, and every per-table outcome so far. Never persisted.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    selector: TableSelector,
    phase: Option<Phase>,
    outcomes: Vec<OutcomeRecord>,
}

impl PipelineRun {
    pub fn new(selector: TableSelector) -> Self {
        Self {
            selector,
            phase: None,
            outcomes: Vec::new(),
        }
    }

    pub fn selector(&self) -> &TableSelector {
        &self.selector
    }

    /// The phase currently (or most recently) executing.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn outcomes(&self) -> &[OutcomeRecord] {
        &self.outcomes
    }

    /// Tables that completed `phase`, in execution order.
    pub fn succeeded(&self, phase: Phase) -> Vec<&str> {
        self.tables_with(phase, |o| matches!(o, TableOutcome::Succeeded))
    }

    pub fn skipped(&self, phase: Phase) -> Vec<&str> {
        self.tables_with(phase, |o| matches!(o, TableOutcome::Skipped))
    }

    /// The failing record, if any phase failed.
    pub fn failure(&self) -> Option<&OutcomeRecord> {
        self.outcomes
            .iter()
            .find(|r| matches!(r.outcome, TableOutcome::Failed(_)))
    }

    fn tables_with(&self, phase: Phase, pred: impl Fn(&TableOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|r| r.phase == phase && pred(&r.outcome))
            .map(|r| r.table.as_str())
            .collect()
    }

    fn begin(&mut self, phase: Phase) {
        self.phase = Some(phase);
    }

    fn record(&mut self, phase: Phase, table: &str, outcome: TableOutcome) {
        self.outcomes.push(OutcomeRecord {
            phase,
            table: table.to_string(),
            outcome,
        });
    }
}

/// Values substituted into staging load statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadContext {
    /// Access-role identifier the warehouse uses to read object storage.
    pub role_arn: String,
    pub region: String,
    /// Logical staging table name → storage location.
    pub sources: BTreeMap<String, String>,
}

pub struct EtlOrchestrator<'a, S: ?Sized> {
    catalog: &'a Catalog,
    session: &'a mut S,
    load: LoadContext,
}

impl<'a, S: Session + ?Sized> EtlOrchestrator<'a, S> {
    pub fn new(catalog: &'a Catalog, session: &'a mut S, load: LoadContext) -> Self {
        Self {
            catalog,
            session,
            load,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    /// Execute every selected table's drop statement.
    pub fn drop_tables(&mut self, run: &mut PipelineRun) -> EtlResult<()> {
        self.run_phase(run, Phase::Drop)
    }

    /// Execute every selected table's create statement.
    pub fn create_tables(&mut self, run: &mut PipelineRun) -> EtlResult<()> {
        self.run_phase(run, Phase::Create)
    }

    /// Load selected staging tables from their source locations.
    pub fn load_staging(&mut self, run: &mut PipelineRun) -> EtlResult<()> {
        self.run_phase(run, Phase::Load)
    }

    /// Populate selected dimension tables, then selected fact tables.
    pub fn transform(&mut self, run: &mut PipelineRun) -> EtlResult<()> {
        self.run_phase(run, Phase::Transform)
    }

    /// Drop then create.
    pub fn reset(&mut self, run: &mut PipelineRun) -> EtlResult<()> {
        self.drop_tables(run)?;
        self.create_tables(run)
    }

    /// Load then transform.
    pub fn populate(&mut self, run: &mut PipelineRun) -> EtlResult<()> {
        self.load_staging(run)?;
        self.transform(run)
    }

    fn run_phase(&mut self, run: &mut PipelineRun, phase: Phase) -> EtlResult<()> {
        let catalog = self.catalog;
        let resolved = catalog.resolve(&run.selector)?;
        let specs: Vec<&TableSpec> = match phase {
            Phase::Drop | Phase::Create => resolved,
            Phase::Load => resolved
                .into_iter()
                .filter(|t| t.tier == Tier::Staging)
                .collect(),
            Phase::Transform => {
                let (dimensions, facts): (Vec<&TableSpec>, Vec<&TableSpec>) = resolved
                    .into_iter()
                    .filter(|t| t.tier != Tier::Staging)
                    .partition(|t| t.tier == Tier::Dimension);
                dimensions.into_iter().chain(facts).collect()
            }
        };

        run.begin(phase);
        info!(%phase, selector = %run.selector, tables = specs.len(), "phase started");

        // Render every statement first so a missing source fails the phase
        // before anything is committed.
        let mut planned = Vec::with_capacity(specs.len());
        for spec in specs {
            match self.statement(phase, spec) {
                Ok(statement) => planned.push((spec, statement)),
                Err(e) => {
                    error!(%phase, table = %spec.name, error = %e, "cannot render statement; aborting phase");
                    run.record(phase, &spec.name, TableOutcome::Failed(e.to_string()));
                    return Err(e);
                }
            }
        }

        for (spec, statement) in planned {
            let Some(statement) = statement else {
                debug!(%phase, table = %spec.name, "no statement; skipping");
                run.record(phase, &spec.name, TableOutcome::Skipped);
                continue;
            };

            debug!(%phase, table = %spec.name, sql = %statement.trim(), "executing");
            if let Err(source) = self.execute(&statement) {
                error!(%phase, table = %spec.name, error = %source, "statement failed; aborting phase");
                run.record(phase, &spec.name, TableOutcome::Failed(source.to_string()));
                return Err(EtlError::Statement {
                    table: spec.name.clone(),
                    phase,
                    source,
                });
            }
            run.record(phase, &spec.name, TableOutcome::Succeeded);
        }

        info!(
            %phase,
            succeeded = run.succeeded(phase).len(),
            skipped = run.skipped(phase).len(),
            "phase complete"
        );
        Ok(())
    }

    fn statement(&self, phase: Phase, spec: &TableSpec) -> EtlResult<Option<String>> {
        let statement = match phase {
            Phase::Drop => Some(spec.drop_sql.clone()),
            Phase::Create => Some(spec.create_sql.clone()),
            Phase::Load => match &spec.load {
                Some(template) => {
                    let source = self
                        .load
                        .sources
                        .get(&spec.name)
                        .ok_or_else(|| EtlError::MissingSource {
                            table: spec.name.clone(),
                            phase,
                        })?;
                    Some(template.render(
                        &spec.physical_name,
                        source,
                        &self.load.role_arn,
                        &self.load.region,
                    ))
                }
                None => None,
            },
            Phase::Transform => spec.transform.as_ref().map(|t| t.sql.clone()),
        };
        Ok(statement)
    }

    fn execute(&mut self, statement: &str) -> Result<(), SessionError> {
        self.session.execute(statement)?;
        self.session.commit()
    }
}
