//! nectar-cluster: warehouse cluster lifecycle.
//!
//! Wraps a warehouse control plane behind the [`ControlPlane`] trait and
//! drives clusters through `creating → available → deleting → deleted`.
//!
//! # Components
//!
//! - **`control_plane`**: Collaborator contract (describe, create, delete, roles)
//! - **`handle`**: Per-cluster handle: cached endpoint and role, session opening
//! - **`lifecycle`**: Provisioning state machine (`poll`, `ensure_available`, `ensure_deleted`)
//! - **`local`**: redb-backed control plane for local development

pub mod control_plane;
pub mod error;
pub mod handle;
pub mod lifecycle;
pub mod local;
pub mod tables;

pub use control_plane::{ClusterInfo, ControlPlane, ControlPlaneError, CreateClusterRequest, Endpoint};
pub use error::{ClusterError, ClusterResult};
pub use handle::{ClusterHandle, ClusterSettings};
pub use lifecycle::{LifecycleController, LifecycleState, PollOutcome};
pub use local::{LocalControlPlane, LocalOptions};
