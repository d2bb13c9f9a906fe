//! Control-plane collaborator contract.
//!
//! The warehouse provider (a managed cloud service in production, the
//! [`LocalControlPlane`](crate::local::LocalControlPlane) during development)
//! is reached only through this trait.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a control plane.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
    /// The named cluster or role does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request collides with an existing resource or an in-flight
    /// transition (cluster already exists, delete while deleting, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("control plane request failed: {0}")]
    Request(String),
}

/// Network endpoint of a provisioned cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

/// A control plane's view of one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub identifier: String,
    /// Raw status string, e.g. `"creating"` or `"available"`.
    pub status: String,
    pub node_type: String,
    pub node_count: u32,
    pub master_username: String,
    pub db_name: String,
    pub endpoint: Option<Endpoint>,
    pub vpc_id: Option<String>,
}

/// Parameters for a one-shot cluster creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateClusterRequest {
    pub identifier: String,
    pub cluster_type: String,
    pub node_type: String,
    pub node_count: u32,
    pub db_name: String,
    pub master_username: String,
    pub master_password: String,
    pub port: u16,
    pub role_arns: Vec<String>,
}

/// Operations a warehouse control plane must support.
pub trait ControlPlane {
    /// Describe a cluster; `NotFound` if it does not exist.
    fn describe_cluster(&self, identifier: &str) -> Result<ClusterInfo, ControlPlaneError>;

    /// Start creating a cluster. Returns once the request is accepted.
    fn create_cluster(&self, request: &CreateClusterRequest) -> Result<(), ControlPlaneError>;

    /// Start deleting a cluster.
    fn delete_cluster(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> Result<(), ControlPlaneError>;

    /// Create the named access role and return its identifier.
    /// `Conflict` if it already exists.
    fn attach_role(&self, name: &str) -> Result<String, ControlPlaneError>;

    /// Look up the identifier of an existing access role.
    fn get_role(&self, name: &str) -> Result<String, ControlPlaneError>;
}

impl<T: ControlPlane + ?Sized> ControlPlane for Box<T> {
    fn describe_cluster(&self, identifier: &str) -> Result<ClusterInfo, ControlPlaneError> {
        (**self).describe_cluster(identifier)
    }

    fn create_cluster(&self, request: &CreateClusterRequest) -> Result<(), ControlPlaneError> {
        (**self).create_cluster(request)
    }

    fn delete_cluster(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> Result<(), ControlPlaneError> {
        (**self).delete_cluster(identifier, skip_final_snapshot)
    }

    fn attach_role(&self, name: &str) -> Result<String, ControlPlaneError> {
        (**self).attach_role(name)
    }

    fn get_role(&self, name: &str) -> Result<String, ControlPlaneError> {
        (**self).get_role(name)
    }
}
