//! DataQualityGate: read-only checks run after a successful transform.
//!
//! Checks run in order and stop at the first failure:
//!
//! 1. **populated**: every catalog table has at least one row.
//! 2. **join coverage present**: some fact rows carry the coverage column.
//! 3. **join coverage partial**: fewer fact rows carry it than exist, so
//!    the left join is not matching every row.

use std::fmt;

use tracing::{info, warn};

use nectar_catalog::honeypot::{ATTACKS, REPUTATION_COLUMN};
use nectar_catalog::{Catalog, CatalogError};
use nectar_core::Session;

use crate::error::{EtlError, EtlResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityCheck {
    Populated,
    JoinCoveragePresent,
    JoinCoveragePartial,
}

impl QualityCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityCheck::Populated => "populated",
            QualityCheck::JoinCoveragePresent => "join coverage present",
            QualityCheck::JoinCoveragePartial => "join coverage partial",
        }
    }
}

impl fmt::Display for QualityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed values from a passing gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    /// Row count per table, in catalog order.
    pub row_counts: Vec<(String, i64)>,
    pub covered_rows: i64,
    pub fact_rows: i64,
}

pub struct DataQualityGate<'a> {
    catalog: &'a Catalog,
    fact_table: String,
    coverage_column: String,
}

impl<'a> DataQualityGate<'a> {
    /// `fact_table` is a logical catalog name; `coverage_column` is the fact
    /// column populated only by the optional join.
    pub fn new(catalog: &'a Catalog, fact_table: &str, coverage_column: &str) -> Self {
        Self {
            catalog,
            fact_table: fact_table.to_string(),
            coverage_column: coverage_column.to_string(),
        }
    }

    /// Gate for the honeypot schema: reputation coverage of `attacks`.
    pub fn honeypot(catalog: &'a Catalog) -> Self {
        Self::new(catalog, ATTACKS, REPUTATION_COLUMN)
    }

    /// Run all three checks in order.
    pub fn run<S: Session + ?Sized>(&self, session: &mut S) -> EtlResult<QualityReport> {
        let row_counts = self.check_populated(session)?;
        let covered_rows = self.check_coverage_present(session)?;
        let fact_rows = self.check_coverage_partial(session, covered_rows)?;
        info!(
            tables = row_counts.len(),
            covered_rows, fact_rows, "all data quality checks passed"
        );
        Ok(QualityReport {
            row_counts,
            covered_rows,
            fact_rows,
        })
    }

    /// Every table has rows. Fails on the first empty table.
    pub fn check_populated<S: Session + ?Sized>(
        &self,
        session: &mut S,
    ) -> EtlResult<Vec<(String, i64)>> {
        let check = QualityCheck::Populated;
        let mut counts = Vec::with_capacity(self.catalog.len());
        for spec in self.catalog.tables() {
            let rows = count(
                session,
                check,
                &format!("SELECT COUNT(*) FROM {};", spec.physical_name),
            )?;
            if rows <= 0 {
                warn!(%check, table = %spec.name, "table is empty");
                return Err(EtlError::DataQuality {
                    check,
                    detail: format!("table {} has no rows", spec.name),
                });
            }
            counts.push((spec.name.clone(), rows));
        }
        info!(%check, tables = counts.len(), "check passed");
        Ok(counts)
    }

    /// At least one fact row has a non-null coverage column.
    pub fn check_coverage_present<S: Session + ?Sized>(&self, session: &mut S) -> EtlResult<i64> {
        let check = QualityCheck::JoinCoveragePresent;
        let covered = count(session, check, &self.covered_query()?)?;
        if covered <= 0 {
            warn!(%check, fact = %self.fact_table, "no fact rows matched the join");
            return Err(EtlError::DataQuality {
                check,
                detail: format!(
                    "no rows in {} have a non-null {}",
                    self.fact_table, self.coverage_column
                ),
            });
        }
        info!(%check, covered, "check passed");
        Ok(covered)
    }

    /// Strictly fewer covered rows than fact rows.
    pub fn check_coverage_partial<S: Session + ?Sized>(
        &self,
        session: &mut S,
        covered: i64,
    ) -> EtlResult<i64> {
        let check = QualityCheck::JoinCoveragePartial;
        let physical = self.fact_physical()?;
        let total = count(session, check, &format!("SELECT COUNT(*) FROM {physical};"))?;
        if covered >= total {
            warn!(%check, covered, total, "every fact row matched the join");
            return Err(EtlError::DataQuality {
                check,
                detail: format!(
                    "{covered} of {total} rows in {} have a non-null {}; expected fewer",
                    self.fact_table, self.coverage_column
                ),
            });
        }
        info!(%check, covered, total, "check passed");
        Ok(total)
    }

    fn fact_physical(&self) -> EtlResult<&str> {
        self.catalog
            .get(&self.fact_table)
            .map(|t| t.physical_name.as_str())
            .ok_or_else(|| CatalogError::UnknownTable(self.fact_table.clone()).into())
    }

    fn covered_query(&self) -> EtlResult<String> {
        Ok(format!(
            "SELECT COUNT(*) FROM {} WHERE {} IS NOT NULL;",
            self.fact_physical()?,
            self.coverage_column
        ))
    }
}

fn count<S: Session + ?Sized>(session: &mut S, check: QualityCheck, query: &str) -> EtlResult<i64> {
    session
        .query_count(query)
        .map_err(|source| EtlError::QualityQuery { check, source })
}
