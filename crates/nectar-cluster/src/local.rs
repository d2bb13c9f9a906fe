//! LocalControlPlane: a redb-backed control plane for local development.
//!
//! Emulates a managed warehouse service in front of an existing Postgres
//! server: clusters are records that walk `creating → available` and
//! `deleting → gone` as they are described, and their endpoint is the
//! configured host. Records are JSON-serialized into redb `&[u8]` columns,
//! either on disk or in memory (for tests).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

use nectar_core::ClusterStatus;
use nectar_core::config::ControlPlaneConfig;

use crate::control_plane::{
    ClusterInfo, ControlPlane, ControlPlaneError, CreateClusterRequest, Endpoint,
};
use crate::tables::{CLUSTERS, ROLES};

/// Convert any `Display` error into a `ControlPlaneError::Request`.
macro_rules! map_err {
    ($what:literal) => {
        |e| ControlPlaneError::Request(format!(concat!($what, ": {}"), e))
    };
}

/// Tunables for the emulated provisioning timeline.
#[derive(Debug, Clone)]
pub struct LocalOptions {
    /// Host reported as the endpoint of available clusters.
    pub endpoint_host: String,
    /// Describes answered with `creating` before a cluster becomes available.
    pub provisioning_polls: u32,
    /// Describes answered with `deleting` before a cluster disappears.
    pub deprovisioning_polls: u32,
}

impl Default for LocalOptions {
    fn default() -> Self {
        Self {
            endpoint_host: "localhost".to_string(),
            provisioning_polls: 2,
            deprovisioning_polls: 1,
        }
    }
}

impl From<&ControlPlaneConfig> for LocalOptions {
    fn from(config: &ControlPlaneConfig) -> Self {
        Self {
            endpoint_host: config.endpoint_host.clone(),
            provisioning_polls: config.provisioning_polls,
            deprovisioning_polls: config.deprovisioning_polls,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClusterRecord {
    request: CreateClusterRequest,
    status: ClusterStatus,
    polls_remaining: u32,
}

/// Thread-safe local control plane backed by redb.
#[derive(Clone)]
pub struct LocalControlPlane {
    db: Arc<Database>,
    options: LocalOptions,
}

impl LocalControlPlane {
    /// Open (or create) a persistent control-plane state file.
    pub fn open(path: &Path, options: LocalOptions) -> Result<Self, ControlPlaneError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(map_err!("create state dir"))?;
        }
        let db = Database::create(path).map_err(map_err!("open state"))?;
        let plane = Self {
            db: Arc::new(db),
            options,
        };
        plane.ensure_tables()?;
        debug!(?path, "local control plane opened");
        Ok(plane)
    }

    /// Create an ephemeral in-memory control plane (for testing).
    pub fn open_in_memory(options: LocalOptions) -> Result<Self, ControlPlaneError> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!("open state"))?;
        let plane = Self {
            db: Arc::new(db),
            options,
        };
        plane.ensure_tables()?;
        Ok(plane)
    }

    fn ensure_tables(&self) -> Result<(), ControlPlaneError> {
        let txn = self.db.begin_write().map_err(map_err!("transaction"))?;
        txn.open_table(CLUSTERS).map_err(map_err!("table"))?;
        txn.open_table(ROLES).map_err(map_err!("table"))?;
        txn.commit().map_err(map_err!("commit"))?;
        Ok(())
    }

    /// Identifiers of every cluster the control plane still knows about.
    pub fn list_clusters(&self) -> Result<Vec<String>, ControlPlaneError> {
        let txn = self.db.begin_read().map_err(map_err!("transaction"))?;
        let table = txn.open_table(CLUSTERS).map_err(map_err!("table"))?;
        let mut ids = Vec::new();
        for entry in table.iter().map_err(map_err!("read"))? {
            let (key, _) = entry.map_err(map_err!("read"))?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    fn read_record(&self, identifier: &str) -> Result<Option<ClusterRecord>, ControlPlaneError> {
        let txn = self.db.begin_read().map_err(map_err!("transaction"))?;
        let table = txn.open_table(CLUSTERS).map_err(map_err!("table"))?;
        match table.get(identifier).map_err(map_err!("read"))? {
            Some(guard) => {
                let record = serde_json::from_slice(guard.value()).map_err(map_err!("decode"))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Store `record`, or remove the cluster when `record` is `None`.
    fn write_record(
        &self,
        identifier: &str,
        record: Option<&ClusterRecord>,
    ) -> Result<(), ControlPlaneError> {
        let txn = self.db.begin_write().map_err(map_err!("transaction"))?;
        {
            let mut table = txn.open_table(CLUSTERS).map_err(map_err!("table"))?;
            match record {
                Some(record) => {
                    let value = serde_json::to_vec(record).map_err(map_err!("encode"))?;
                    table
                        .insert(identifier, value.as_slice())
                        .map_err(map_err!("write"))?;
                }
                None => {
                    table.remove(identifier).map_err(map_err!("write"))?;
                }
            }
        }
        txn.commit().map_err(map_err!("commit"))?;
        Ok(())
    }

    fn info(&self, record: &ClusterRecord) -> ClusterInfo {
        let endpoint = (record.status == ClusterStatus::Available).then(|| Endpoint {
            address: self.options.endpoint_host.clone(),
            port: record.request.port,
        });
        ClusterInfo {
            identifier: record.request.identifier.clone(),
            status: record.status.as_str().to_string(),
            node_type: record.request.node_type.clone(),
            node_count: record.request.node_count,
            master_username: record.request.master_username.clone(),
            db_name: record.request.db_name.clone(),
            endpoint,
            vpc_id: None,
        }
    }
}

impl ControlPlane for LocalControlPlane {
    fn describe_cluster(&self, identifier: &str) -> Result<ClusterInfo, ControlPlaneError> {
        let mut record = self
            .read_record(identifier)?
            .ok_or_else(|| ControlPlaneError::NotFound(identifier.to_string()))?;

        match record.status {
            ClusterStatus::Creating if record.polls_remaining == 0 => {
                record.status = ClusterStatus::Available;
                debug!(cluster = %identifier, "local cluster became available");
            }
            ClusterStatus::Deleting if record.polls_remaining == 0 => {
                self.write_record(identifier, None)?;
                debug!(cluster = %identifier, "local cluster removed");
                return Err(ControlPlaneError::NotFound(identifier.to_string()));
            }
            ClusterStatus::Creating | ClusterStatus::Deleting => {
                record.polls_remaining -= 1;
            }
            _ => {}
        }

        self.write_record(identifier, Some(&record))?;
        Ok(self.info(&record))
    }

    fn create_cluster(&self, request: &CreateClusterRequest) -> Result<(), ControlPlaneError> {
        if let Some(existing) = self.read_record(&request.identifier)? {
            return Err(ControlPlaneError::Conflict(format!(
                "cluster {} already exists ({})",
                request.identifier, existing.status
            )));
        }
        let record = ClusterRecord {
            request: request.clone(),
            status: ClusterStatus::Creating,
            polls_remaining: self.options.provisioning_polls,
        };
        self.write_record(&request.identifier, Some(&record))?;
        debug!(cluster = %request.identifier, "local cluster creating");
        Ok(())
    }

    fn delete_cluster(
        &self,
        identifier: &str,
        _skip_final_snapshot: bool,
    ) -> Result<(), ControlPlaneError> {
        let mut record = self
            .read_record(identifier)?
            .ok_or_else(|| ControlPlaneError::NotFound(identifier.to_string()))?;
        if record.status == ClusterStatus::Deleting {
            return Err(ControlPlaneError::Conflict(format!(
                "cluster {identifier} is already deleting"
            )));
        }
        record.status = ClusterStatus::Deleting;
        record.polls_remaining = self.options.deprovisioning_polls;
        self.write_record(identifier, Some(&record))?;
        debug!(cluster = %identifier, "local cluster deleting");
        Ok(())
    }

    fn attach_role(&self, name: &str) -> Result<String, ControlPlaneError> {
        let arn = format!("arn:nectar:iam::local:role/{name}");
        let txn = self.db.begin_write().map_err(map_err!("transaction"))?;
        {
            let mut table = txn.open_table(ROLES).map_err(map_err!("table"))?;
            if table.get(name).map_err(map_err!("read"))?.is_some() {
                return Err(ControlPlaneError::Conflict(format!(
                    "role {name} already exists"
                )));
            }
            table
                .insert(name, arn.as_bytes())
                .map_err(map_err!("write"))?;
        }
        txn.commit().map_err(map_err!("commit"))?;
        Ok(arn)
    }

    fn get_role(&self, name: &str) -> Result<String, ControlPlaneError> {
        let txn = self.db.begin_read().map_err(map_err!("transaction"))?;
        let table = txn.open_table(ROLES).map_err(map_err!("table"))?;
        match table.get(name).map_err(map_err!("read"))? {
            Some(guard) => Ok(String::from_utf8_lossy(guard.value()).into_owned()),
            None => Err(ControlPlaneError::NotFound(format!("role {name}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> CreateClusterRequest {
        CreateClusterRequest {
            identifier: id.to_string(),
            cluster_type: "single-node".to_string(),
            node_type: "dc2.large".to_string(),
            node_count: 1,
            db_name: "honeypot".to_string(),
            master_username: "nectar".to_string(),
            master_password: "secret".to_string(),
            port: 5432,
            role_arns: vec![],
        }
    }

    fn plane(provisioning: u32, deprovisioning: u32) -> LocalControlPlane {
        LocalControlPlane::open_in_memory(LocalOptions {
            endpoint_host: "127.0.0.1".to_string(),
            provisioning_polls: provisioning,
            deprovisioning_polls: deprovisioning,
        })
        .unwrap()
    }

    #[test]
    fn describe_missing_cluster_is_not_found() {
        let cp = plane(0, 0);
        assert!(matches!(
            cp.describe_cluster("nope"),
            Err(ControlPlaneError::NotFound(_))
        ));
    }

    #[test]
    fn cluster_becomes_available_after_polls() {
        let cp = plane(2, 0);
        cp.create_cluster(&request("dwh")).unwrap();

        assert_eq!(cp.describe_cluster("dwh").unwrap().status, "creating");
        assert_eq!(cp.describe_cluster("dwh").unwrap().status, "creating");
        let info = cp.describe_cluster("dwh").unwrap();
        assert_eq!(info.status, "available");
        assert_eq!(
            info.endpoint,
            Some(Endpoint {
                address: "127.0.0.1".to_string(),
                port: 5432
            })
        );
    }

    #[test]
    fn create_conflicts_with_existing_cluster() {
        let cp = plane(0, 0);
        cp.create_cluster(&request("dwh")).unwrap();
        assert!(matches!(
            cp.create_cluster(&request("dwh")),
            Err(ControlPlaneError::Conflict(_))
        ));
    }

    #[test]
    fn delete_walks_to_not_found() {
        let cp = plane(0, 1);
        cp.create_cluster(&request("dwh")).unwrap();
        cp.describe_cluster("dwh").unwrap();

        cp.delete_cluster("dwh", true).unwrap();
        assert!(matches!(
            cp.delete_cluster("dwh", true),
            Err(ControlPlaneError::Conflict(_))
        ));
        assert_eq!(cp.describe_cluster("dwh").unwrap().status, "deleting");
        assert!(matches!(
            cp.describe_cluster("dwh"),
            Err(ControlPlaneError::NotFound(_))
        ));
        assert!(cp.list_clusters().unwrap().is_empty());
    }

    #[test]
    fn roles_attach_once() {
        let cp = plane(0, 0);
        assert!(matches!(cp.get_role("r"), Err(ControlPlaneError::NotFound(_))));
        let arn = cp.attach_role("r").unwrap();
        assert_eq!(arn, "arn:nectar:iam::local:role/r");
        assert!(matches!(cp.attach_role("r"), Err(ControlPlaneError::Conflict(_))));
        assert_eq!(cp.get_role("r").unwrap(), arn);
    }
}
