//! Hand-written session fakes shared by unit tests.

use std::collections::HashMap;

use nectar_core::{Session, SessionError};

/// Records every statement and commit; optionally fails statements that
/// contain a marker.
#[derive(Default)]
pub struct RecordingSession {
    pub executed: Vec<String>,
    /// `executed.len()` at each commit.
    pub commits_after: Vec<usize>,
    fail_on: Option<String>,
}

impl RecordingSession {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::default()
        }
    }
}

impl Session for RecordingSession {
    fn execute(&mut self, statement: &str) -> Result<(), SessionError> {
        self.executed.push(statement.to_string());
        match &self.fail_on {
            Some(marker) if statement.contains(marker.as_str()) => {
                Err(SessionError::Execute(format!("relation rejected: {marker}")))
            }
            _ => Ok(()),
        }
    }

    fn commit(&mut self) -> Result<(), SessionError> {
        self.commits_after.push(self.executed.len());
        Ok(())
    }

    fn query_count(&mut self, statement: &str) -> Result<i64, SessionError> {
        Err(SessionError::Query(format!("unexpected query: {statement}")))
    }
}

/// Answers `SELECT COUNT(*)` queries from canned per-table counts.
pub struct CountingSession {
    pub counts: HashMap<String, i64>,
    /// Count returned for `... WHERE <column> IS NOT NULL` queries.
    pub covered: i64,
    pub default_count: i64,
    pub queries: Vec<String>,
}

impl CountingSession {
    pub fn new(default_count: i64, covered: i64) -> Self {
        Self {
            counts: HashMap::new(),
            covered,
            default_count,
            queries: Vec::new(),
        }
    }

    pub fn with_count(mut self, table: &str, count: i64) -> Self {
        self.counts.insert(table.to_string(), count);
        self
    }
}

impl Session for CountingSession {
    fn execute(&mut self, statement: &str) -> Result<(), SessionError> {
        Err(SessionError::Execute(format!("read-only fake: {statement}")))
    }

    fn commit(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    fn query_count(&mut self, statement: &str) -> Result<i64, SessionError> {
        self.queries.push(statement.to_string());
        if statement.contains("IS NOT NULL") {
            return Ok(self.covered);
        }
        let table = statement
            .split("FROM ")
            .nth(1)
            .map(|rest| rest.trim_end_matches(';').trim())
            .unwrap_or_default();
        Ok(self.counts.get(table).copied().unwrap_or(self.default_count))
    }
}
