//! Shared types used across nectar crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a warehouse cluster as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    Creating,
    Available,
    Deleting,
    /// The control plane no longer knows the cluster.
    Deleted,
    /// Any status nectar does not drive (modifying, rebooting, ...).
    Unknown,
}

impl ClusterStatus {
    /// Map a raw control-plane status string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "creating" => ClusterStatus::Creating,
            "available" => ClusterStatus::Available,
            "deleting" => ClusterStatus::Deleting,
            "deleted" => ClusterStatus::Deleted,
            _ => ClusterStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Creating => "creating",
            ClusterStatus::Available => "available",
            ClusterStatus::Deleting => "deleting",
            ClusterStatus::Deleted => "deleted",
            ClusterStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity, configuration, and last observed state of one warehouse cluster.
///
/// `endpoint` is `Some` only while `status` is `Available`; `role_arn` is
/// `Some` only after the access role has been attached or resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDescriptor {
    pub identifier: String,
    pub node_type: String,
    pub node_count: u32,
    pub master_username: String,
    pub db_name: String,
    pub port: u16,
    pub status: ClusterStatus,
    pub endpoint: Option<String>,
    pub role_arn: Option<String>,
}

impl ClusterDescriptor {
    pub fn is_available(&self) -> bool {
        self.status == ClusterStatus::Available && self.endpoint.is_some()
    }
}

impl fmt::Display for ClusterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}x{} db={} user={} endpoint={} role={}",
            self.identifier,
            self.status,
            self.node_count,
            self.node_type,
            self.db_name,
            self.master_username,
            self.endpoint.as_deref().unwrap_or("-"),
            self.role_arn.as_deref().unwrap_or("-"),
        )
    }
}

/// Everything needed to open a database session against an available cluster.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectInfo {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ConnectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectInfo")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(ClusterStatus::parse("Available"), ClusterStatus::Available);
        assert_eq!(ClusterStatus::parse("creating"), ClusterStatus::Creating);
        assert_eq!(ClusterStatus::parse(" deleting "), ClusterStatus::Deleting);
        assert_eq!(ClusterStatus::parse("modifying"), ClusterStatus::Unknown);
    }

    #[test]
    fn connect_info_debug_hides_password() {
        let info = ConnectInfo {
            host: "localhost".to_string(),
            port: 5439,
            dbname: "honeypot".to_string(),
            user: "nectar".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{info:?}").contains("hunter2"));
    }
}
