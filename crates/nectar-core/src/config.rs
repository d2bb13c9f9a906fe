//! nectar.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NectarConfig {
    pub cluster: ClusterConfig,
    pub database: DatabaseConfig,
    pub iam_role: IamRoleConfig,
    /// Staging table name → object-storage location read by its load statement.
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,
    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub identifier: String,
    #[serde(default = "default_cluster_type")]
    pub cluster_type: String,
    pub node_type: String,
    pub node_count: u32,
    #[serde(default = "default_region")]
    pub region: String,
    /// Seconds between status polls while the cluster is provisioning.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub name: String,
    pub user: String,
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamRoleConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPlaneKind {
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    pub kind: ControlPlaneKind,
    pub state_path: String,
    pub endpoint_host: String,
    pub provisioning_polls: u32,
    pub deprovisioning_polls: u32,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            kind: ControlPlaneKind::Local,
            state_path: ".nectar/control-plane.redb".to_string(),
            endpoint_host: "localhost".to_string(),
            provisioning_polls: 2,
            deprovisioning_polls: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    pub base_url: String,
    /// Append results to the output file every N lookups.
    pub write_interval: usize,
    /// Back-off after the lookup service reports its rate limit.
    pub sleep_interval_secs: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://freegeoip.app".to_string(),
            write_interval: 1000,
            sleep_interval_secs: 300,
        }
    }
}

fn default_cluster_type() -> String {
    "multi-node".to_string()
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_port() -> u16 {
    5439
}

impl ClusterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl NectarConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NectarConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a config for a single-node warehouse named `identifier`.
    pub fn scaffold(identifier: &str) -> Self {
        let sources = [
            ("staging_honeypot", "s3://nectar-data/honeypot/"),
            ("staging_ipgeo", "s3://nectar-data/ipgeo/"),
            ("staging_reputation", "s3://nectar-data/reputation/"),
        ]
        .into_iter()
        .map(|(table, location)| (table.to_string(), location.to_string()))
        .collect();

        NectarConfig {
            cluster: ClusterConfig {
                identifier: identifier.to_string(),
                cluster_type: "single-node".to_string(),
                node_type: "dc2.large".to_string(),
                node_count: 1,
                region: default_region(),
                poll_interval_secs: default_poll_interval(),
            },
            database: DatabaseConfig {
                name: "honeypot".to_string(),
                user: "nectar".to_string(),
                password: "change-me".to_string(),
                port: default_port(),
            },
            iam_role: IamRoleConfig {
                name: format!("{identifier}-s3-read"),
            },
            sources,
            control_plane: ControlPlaneConfig::default(),
            geolocation: GeolocationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = NectarConfig::scaffold("honeypot-dwh");
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("honeypot-dwh"));
        assert!(toml_str.contains("staging_ipgeo"));
    }

    #[test]
    fn test_parse_minimal() {
        let toml_str = r#"
[cluster]
identifier = "dwh"
node_type = "dc2.large"
node_count = 4

[database]
name = "honeypot"
user = "awsuser"
password = "secret"

[iam_role]
name = "dwh-role"
"#;
        let config: NectarConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cluster.identifier, "dwh");
        assert_eq!(config.cluster.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.cluster.cluster_type, "multi-node");
        assert_eq!(config.database.port, 5439);
        assert!(config.sources.is_empty());
        assert_eq!(config.control_plane.provisioning_polls, 2);
    }

    #[test]
    fn test_parse_sources() {
        let toml_str = r#"
[cluster]
identifier = "dwh"
node_type = "dc2.large"
node_count = 1
poll_interval_secs = 5

[database]
name = "honeypot"
user = "awsuser"
password = "secret"
port = 5432

[iam_role]
name = "dwh-role"

[sources]
staging_honeypot = "s3://bucket/honeypot.csv"

[control_plane]
kind = "local"
state_path = "/tmp/cp.redb"
endpoint_host = "127.0.0.1"
provisioning_polls = 0
deprovisioning_polls = 0
"#;
        let config: NectarConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.sources.get("staging_honeypot").map(String::as_str),
            Some("s3://bucket/honeypot.csv")
        );
        assert_eq!(config.cluster.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.control_plane.endpoint_host, "127.0.0.1");
    }
}
