//! Database session capabilities consumed by the ETL orchestrator and
//! the data-quality gate.

use thiserror::Error;

use crate::types::ConnectInfo;

/// Errors raised by a database session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("statement failed: {0}")]
    Execute(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("session is closed")]
    Closed,
}

/// A connection-like handle that runs statements one at a time.
///
/// No transaction spans more than one statement: callers `execute` and then
/// `commit` before moving on.
pub trait Session {
    /// Run a statement that returns no rows.
    fn execute(&mut self, statement: &str) -> Result<(), SessionError>;

    /// Make everything executed so far durable.
    fn commit(&mut self) -> Result<(), SessionError>;

    /// Run a query whose first column of the first row is an integer count.
    fn query_count(&mut self, statement: &str) -> Result<i64, SessionError>;
}

/// Opens sessions against a resolved cluster endpoint.
pub trait Connector {
    fn connect(&self, info: &ConnectInfo) -> Result<Box<dyn Session>, SessionError>;
}
