//! Error types for cluster lifecycle operations.

use thiserror::Error;

use nectar_core::{ClusterStatus, SessionError};

use crate::control_plane::ControlPlaneError;

/// Result type alias for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors raised by the cluster handle and the lifecycle controller.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The control plane does not know the cluster.
    #[error("cluster not found: {0}")]
    NotFound(String),

    /// A session was requested before the cluster reported `available`
    /// with a resolved endpoint.
    #[error("cluster {identifier} is not ready (last status: {status})")]
    NotReady {
        identifier: String,
        status: ClusterStatus,
    },

    /// The cluster is mid-transition; retry later.
    #[error("cluster {identifier} is {status}; wait and try again")]
    TransientConflict {
        identifier: String,
        status: ClusterStatus,
    },

    /// `reported` is the control plane's raw status string.
    #[error("cluster {identifier} reported status {reported}, which cannot be driven to {wanted}")]
    UnexpectedStatus {
        identifier: String,
        reported: String,
        wanted: &'static str,
    },

    #[error("access role {0} has not been resolved; attach it before creating the cluster")]
    RoleUnresolved(String),

    #[error("control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),
}
