//! Session backed by the sync `postgres` client.
//!
//! The client runs in autocommit mode: every `batch_execute` is durable once
//! it returns, so `commit` only verifies the connection is still open.
//! The sync client drives its own runtime and must not be used from inside
//! a tokio runtime.

use postgres::{Client, Config, NoTls};
use tracing::debug;

use nectar_core::{ConnectInfo, Connector, Session, SessionError};

/// Opens [`PgSession`]s from resolved connection parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl Connector for PgConnector {
    fn connect(&self, info: &ConnectInfo) -> Result<Box<dyn Session>, SessionError> {
        debug!(host = %info.host, port = info.port, dbname = %info.dbname, "connecting");
        Ok(Box::new(PgSession::from_config(&pg_config(info))?))
    }
}

/// Client configuration built field by field, so credentials need no
/// quoting and an empty password is allowed.
pub(crate) fn pg_config(info: &ConnectInfo) -> Config {
    let mut config = Config::new();
    config
        .host(&info.host)
        .port(info.port)
        .dbname(&info.dbname)
        .user(&info.user)
        .password(&info.password);
    config
}

pub struct PgSession {
    client: Client,
}

impl PgSession {
    /// Connect with a libpq-style connection string or `postgresql://` URI.
    pub fn connect(connstr: &str) -> Result<Self, SessionError> {
        let client =
            Client::connect(connstr, NoTls).map_err(|e| SessionError::Connect(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> Result<Self, SessionError> {
        let client = config
            .connect(NoTls)
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Session for PgSession {
    fn execute(&mut self, statement: &str) -> Result<(), SessionError> {
        self.client
            .batch_execute(statement)
            .map_err(|e| SessionError::Execute(e.to_string()))
    }

    fn commit(&mut self) -> Result<(), SessionError> {
        if self.client.is_closed() {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn query_count(&mut self, statement: &str) -> Result<i64, SessionError> {
        let row = self
            .client
            .query_one(statement, &[])
            .map_err(|e| SessionError::Query(e.to_string()))?;
        row.try_get::<_, i64>(0)
            .map_err(|e| SessionError::Query(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgres::config::Host;

    fn info(password: &str) -> ConnectInfo {
        ConnectInfo {
            host: "warehouse.local".to_string(),
            port: 5439,
            dbname: "honeypot".to_string(),
            user: "nectar".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn config_keeps_password_with_spaces_and_quotes() {
        let config = pg_config(&info("correct horse 'battery'"));
        assert_eq!(
            config.get_password(),
            Some(&b"correct horse 'battery'"[..])
        );
        assert_eq!(config.get_user(), Some("nectar"));
        assert_eq!(config.get_dbname(), Some("honeypot"));
        assert_eq!(config.get_ports(), &[5439]);
        assert_eq!(
            config.get_hosts(),
            &[Host::Tcp("warehouse.local".to_string())]
        );
    }

    #[test]
    fn config_accepts_empty_password() {
        let config = pg_config(&info(""));
        assert_eq!(config.get_password(), Some(&b""[..]));
        assert_eq!(config.get_user(), Some("nectar"));
    }
}
