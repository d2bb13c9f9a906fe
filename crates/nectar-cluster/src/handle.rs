//! ClusterHandle: one named warehouse cluster as seen through a control plane.
//!
//! The handle caches the last observed status, the resolved endpoint, and the
//! access-role identifier. Only the lifecycle controller and the handle's own
//! `describe` write to that cache, so it assumes a single writer.

use tracing::{debug, info};

use nectar_core::{ClusterDescriptor, ClusterStatus, ConnectInfo, Connector, NectarConfig, Session};

use crate::control_plane::{ClusterInfo, ControlPlane, ControlPlaneError, CreateClusterRequest};
use crate::error::{ClusterError, ClusterResult};

/// Static identity and configuration of a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    pub identifier: String,
    pub cluster_type: String,
    pub node_type: String,
    pub node_count: u32,
    pub db_name: String,
    pub master_username: String,
    pub master_password: String,
    pub port: u16,
    pub role_name: String,
}

impl ClusterSettings {
    pub fn from_config(config: &NectarConfig) -> Self {
        Self {
            identifier: config.cluster.identifier.clone(),
            cluster_type: config.cluster.cluster_type.clone(),
            node_type: config.cluster.node_type.clone(),
            node_count: config.cluster.node_count,
            db_name: config.database.name.clone(),
            master_username: config.database.user.clone(),
            master_password: config.database.password.clone(),
            port: config.database.port,
            role_name: config.iam_role.name.clone(),
        }
    }
}

/// Handle to one warehouse cluster.
pub struct ClusterHandle<C> {
    settings: ClusterSettings,
    control_plane: C,
    last_status: Option<ClusterStatus>,
    raw_status: Option<String>,
    endpoint: Option<String>,
    role_arn: Option<String>,
}

impl<C: ControlPlane> ClusterHandle<C> {
    pub fn new(settings: ClusterSettings, control_plane: C) -> Self {
        Self {
            settings,
            control_plane,
            last_status: None,
            raw_status: None,
            endpoint: None,
            role_arn: None,
        }
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    pub fn control_plane(&self) -> &C {
        &self.control_plane
    }

    /// Status reported by the most recent `describe`, if any.
    pub fn last_status(&self) -> Option<ClusterStatus> {
        self.last_status
    }

    /// Status string exactly as the control plane last reported it.
    pub fn raw_status(&self) -> Option<&str> {
        self.raw_status.as_deref()
    }

    /// Cached endpoint address. Survives describes that omit an endpoint.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn.as_deref()
    }

    /// Query the control plane for this cluster.
    ///
    /// A response carrying an endpoint refreshes the cached endpoint. A
    /// response without one leaves the cache alone and is reported as still
    /// provisioning: `available` without an endpoint is surfaced as `creating`.
    pub fn describe(&mut self) -> ClusterResult<ClusterDescriptor> {
        let identifier = self.settings.identifier.clone();
        let info = match self.control_plane.describe_cluster(&identifier) {
            Ok(info) => info,
            Err(ControlPlaneError::NotFound(_)) => {
                self.last_status = Some(ClusterStatus::Deleted);
                self.raw_status = None;
                debug!(cluster = %identifier, "cluster not found");
                return Err(ClusterError::NotFound(identifier));
            }
            Err(e) => return Err(e.into()),
        };

        let mut status = ClusterStatus::parse(&info.status);
        match &info.endpoint {
            Some(endpoint) => {
                self.endpoint = Some(endpoint.address.clone());
            }
            None if status == ClusterStatus::Available => status = ClusterStatus::Creating,
            None => {}
        }
        if status == ClusterStatus::Creating {
            info!(cluster = %identifier, raw_status = %info.status, "cluster is still provisioning");
        }
        self.last_status = Some(status);
        self.raw_status = Some(info.status.clone());
        debug!(cluster = %identifier, raw_status = %info.status, %status, "described cluster");

        Ok(self.descriptor_from(&info, status))
    }

    /// Descriptor built from the cached state, without calling the control plane.
    pub fn descriptor(&self) -> ClusterDescriptor {
        let status = self.last_status.unwrap_or(ClusterStatus::Unknown);
        ClusterDescriptor {
            identifier: self.settings.identifier.clone(),
            node_type: self.settings.node_type.clone(),
            node_count: self.settings.node_count,
            master_username: self.settings.master_username.clone(),
            db_name: self.settings.db_name.clone(),
            port: self.settings.port,
            status,
            endpoint: self.endpoint_if_available(status),
            role_arn: self.role_arn.clone(),
        }
    }

    fn descriptor_from(&self, info: &ClusterInfo, status: ClusterStatus) -> ClusterDescriptor {
        ClusterDescriptor {
            identifier: info.identifier.clone(),
            node_type: info.node_type.clone(),
            node_count: info.node_count,
            master_username: info.master_username.clone(),
            db_name: info.db_name.clone(),
            port: info
                .endpoint
                .as_ref()
                .map(|e| e.port)
                .unwrap_or(self.settings.port),
            status,
            endpoint: self.endpoint_if_available(status),
            role_arn: self.role_arn.clone(),
        }
    }

    fn endpoint_if_available(&self, status: ClusterStatus) -> Option<String> {
        if status == ClusterStatus::Available {
            self.endpoint.clone()
        } else {
            None
        }
    }

    /// Attach the configured access role, or look it up if it already exists,
    /// and cache its identifier. Repeated calls return the cached value.
    pub fn resolve_role(&mut self) -> ClusterResult<String> {
        if let Some(arn) = &self.role_arn {
            return Ok(arn.clone());
        }

        let name = self.settings.role_name.clone();
        let arn = match self.control_plane.attach_role(&name) {
            Ok(arn) => {
                info!(role = %name, %arn, "access role attached");
                arn
            }
            Err(ControlPlaneError::Conflict(_)) => {
                let arn = self.control_plane.get_role(&name)?;
                debug!(role = %name, %arn, "access role already exists");
                arn
            }
            Err(e) => return Err(e.into()),
        };

        self.role_arn = Some(arn.clone());
        Ok(arn)
    }

    /// Issue a creation request. Not idempotent: a cluster with the same
    /// identifier surfaces the control plane's conflict error.
    pub fn request_create(&mut self) -> ClusterResult<()> {
        let role_arn = self
            .role_arn
            .clone()
            .ok_or_else(|| ClusterError::RoleUnresolved(self.settings.role_name.clone()))?;

        let request = CreateClusterRequest {
            identifier: self.settings.identifier.clone(),
            cluster_type: self.settings.cluster_type.clone(),
            node_type: self.settings.node_type.clone(),
            node_count: self.settings.node_count,
            db_name: self.settings.db_name.clone(),
            master_username: self.settings.master_username.clone(),
            master_password: self.settings.master_password.clone(),
            port: self.settings.port,
            role_arns: vec![role_arn],
        };
        self.control_plane.create_cluster(&request)?;
        self.last_status = Some(ClusterStatus::Creating);
        info!(
            cluster = %self.settings.identifier,
            node_type = %self.settings.node_type,
            nodes = self.settings.node_count,
            "cluster creation requested"
        );
        Ok(())
    }

    /// Issue a deletion request, skipping the final snapshot.
    pub fn request_delete(&mut self) -> ClusterResult<()> {
        let identifier = self.settings.identifier.clone();
        match self.control_plane.delete_cluster(&identifier, true) {
            Ok(()) => {}
            Err(ControlPlaneError::NotFound(_)) => {
                self.last_status = Some(ClusterStatus::Deleted);
                return Err(ClusterError::NotFound(identifier));
            }
            Err(e) => return Err(e.into()),
        }
        self.last_status = Some(ClusterStatus::Deleting);
        self.endpoint = None;
        info!(cluster = %identifier, "cluster deletion requested");
        Ok(())
    }

    /// Connection parameters for the cluster, if the last describe reported
    /// it available with an endpoint.
    pub fn connect_info(&self) -> ClusterResult<ConnectInfo> {
        match (self.last_status, &self.endpoint) {
            (Some(ClusterStatus::Available), Some(host)) => Ok(ConnectInfo {
                host: host.clone(),
                port: self.settings.port,
                dbname: self.settings.db_name.clone(),
                user: self.settings.master_username.clone(),
                password: self.settings.master_password.clone(),
            }),
            (status, _) => Err(ClusterError::NotReady {
                identifier: self.settings.identifier.clone(),
                status: status.unwrap_or(ClusterStatus::Unknown),
            }),
        }
    }

    /// Open a database session on the cluster.
    pub fn open_session(&self, connector: &dyn Connector) -> ClusterResult<Box<dyn Session>> {
        let info = self.connect_info()?;
        debug!(cluster = %self.settings.identifier, host = %info.host, port = info.port, "opening session");
        Ok(connector.connect(&info)?)
    }
}
