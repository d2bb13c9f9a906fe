//! Lifecycle controller: drives a cluster to `available` or `deleted`.
//!
//! `poll()` is a single step of the state machine. `ensure_available()` is
//! the caller-side loop over it: it sleeps `poll_interval` between polls and
//! has no deadline, so a cluster stuck in `creating` blocks the caller until
//! the process is cancelled. Callers that need a deadline or cancellation
//! drive `poll()` themselves.

use std::time::Duration;

use tracing::{debug, info, warn};

use nectar_core::{ClusterDescriptor, ClusterStatus};

use crate::control_plane::ControlPlane;
use crate::error::{ClusterError, ClusterResult};
use crate::handle::ClusterHandle;

/// Logical state tracked by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not yet described.
    Unknown,
    Creating,
    Available,
    Deleting,
    Deleted,
    /// The cluster is in a state the controller cannot drive. Holds the raw
    /// status string from the control plane.
    Error(String),
}

impl LifecycleState {
    fn from_status(status: ClusterStatus, raw: Option<&str>) -> Self {
        match status {
            ClusterStatus::Creating => LifecycleState::Creating,
            ClusterStatus::Available => LifecycleState::Available,
            ClusterStatus::Deleting => LifecycleState::Deleting,
            ClusterStatus::Deleted => LifecycleState::Deleted,
            ClusterStatus::Unknown => LifecycleState::Error(raw.unwrap_or("unknown").to_string()),
        }
    }
}

/// Result of a single `poll()` step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Still provisioning; poll again later.
    Pending(ClusterStatus),
    /// Available with a resolved endpoint and access role.
    Ready(ClusterDescriptor),
}

/// State machine over a [`ClusterHandle`].
pub struct LifecycleController<C> {
    handle: ClusterHandle<C>,
    state: LifecycleState,
    poll_interval: Duration,
}

impl<C: ControlPlane> LifecycleController<C> {
    pub fn new(handle: ClusterHandle<C>, poll_interval: Duration) -> Self {
        Self {
            handle,
            state: LifecycleState::Unknown,
            poll_interval,
        }
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn handle(&self) -> &ClusterHandle<C> {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut ClusterHandle<C> {
        &mut self.handle
    }

    pub fn into_handle(self) -> ClusterHandle<C> {
        self.handle
    }

    /// Describe the cluster and update the logical state. A missing cluster
    /// is reported as `deleted`, not as an error.
    pub fn status(&mut self) -> ClusterResult<ClusterDescriptor> {
        self.refresh()?;
        Ok(self.handle.descriptor())
    }

    fn refresh(&mut self) -> ClusterResult<&LifecycleState> {
        let next = match self.handle.describe() {
            Ok(descriptor) => {
                LifecycleState::from_status(descriptor.status, self.handle.raw_status())
            }
            Err(ClusterError::NotFound(_)) => LifecycleState::Deleted,
            Err(e) => return Err(e),
        };
        if next != self.state {
            debug!(
                cluster = %self.handle.settings().identifier,
                from = ?self.state,
                to = ?next,
                "lifecycle transition"
            );
        }
        self.state = next;
        Ok(&self.state)
    }

    /// One step: describe once and report whether the cluster is ready.
    ///
    /// Reaching `available` resolves and caches the access role.
    pub fn poll(&mut self) -> ClusterResult<PollOutcome> {
        let state = self.refresh()?.clone();
        match state {
            LifecycleState::Available => {
                self.handle.resolve_role()?;
                let descriptor = self.handle.descriptor();
                info!(
                    cluster = %descriptor.identifier,
                    endpoint = descriptor.endpoint.as_deref().unwrap_or("-"),
                    "cluster is available"
                );
                Ok(PollOutcome::Ready(descriptor))
            }
            LifecycleState::Creating => Ok(PollOutcome::Pending(ClusterStatus::Creating)),
            LifecycleState::Deleting => Err(self.conflict(ClusterStatus::Deleting)),
            LifecycleState::Deleted => Err(ClusterError::NotFound(
                self.handle.settings().identifier.clone(),
            )),
            LifecycleState::Unknown | LifecycleState::Error(_) => {
                Err(self.unexpected("available"))
            }
        }
    }

    /// Drive the cluster to `available`, creating it if it does not exist.
    ///
    /// A cluster that is `deleting` fails fast with `TransientConflict`
    /// without polling.
    pub fn ensure_available(&mut self) -> ClusterResult<ClusterDescriptor> {
        let identifier = self.handle.settings().identifier.clone();
        match self.refresh()?.clone() {
            LifecycleState::Available => {
                self.handle.resolve_role()?;
                let descriptor = self.handle.descriptor();
                info!(cluster = %identifier, "cluster already available");
                return Ok(descriptor);
            }
            LifecycleState::Creating => {
                info!(cluster = %identifier, "cluster is being created; waiting");
            }
            LifecycleState::Deleted => {
                self.handle.resolve_role()?;
                self.handle.request_create()?;
                self.state = LifecycleState::Creating;
            }
            LifecycleState::Deleting => {
                warn!(cluster = %identifier, "cluster is deleting; refusing to wait");
                return Err(self.conflict(ClusterStatus::Deleting));
            }
            LifecycleState::Unknown | LifecycleState::Error(_) => {
                return Err(self.unexpected("available"));
            }
        }

        loop {
            debug!(
                cluster = %identifier,
                interval_secs = self.poll_interval.as_secs(),
                "sleeping before next status poll"
            );
            std::thread::sleep(self.poll_interval);
            match self.poll()? {
                PollOutcome::Ready(descriptor) => return Ok(descriptor),
                PollOutcome::Pending(status) => {
                    debug!(cluster = %identifier, %status, "cluster still provisioning");
                }
            }
        }
    }

    /// Request deletion of an available cluster. A cluster that is already
    /// deleting or gone counts as success.
    pub fn ensure_deleted(&mut self) -> ClusterResult<LifecycleState> {
        let identifier = self.handle.settings().identifier.clone();
        match self.refresh()?.clone() {
            LifecycleState::Available => {
                match self.handle.request_delete() {
                    Ok(()) => self.state = LifecycleState::Deleting,
                    Err(ClusterError::NotFound(_)) => self.state = LifecycleState::Deleted,
                    Err(e) => return Err(e),
                }
                info!(cluster = %identifier, "cluster is shutting down");
            }
            LifecycleState::Deleting | LifecycleState::Deleted => {
                info!(cluster = %identifier, state = ?self.state, "cluster already shut down");
            }
            LifecycleState::Creating => {
                return Err(self.conflict(ClusterStatus::Creating));
            }
            LifecycleState::Unknown | LifecycleState::Error(_) => {
                return Err(self.unexpected("deleted"));
            }
        }
        Ok(self.state.clone())
    }

    fn conflict(&self, status: ClusterStatus) -> ClusterError {
        ClusterError::TransientConflict {
            identifier: self.handle.settings().identifier.clone(),
            status,
        }
    }

    fn unexpected(&self, wanted: &'static str) -> ClusterError {
        let reported = match &self.state {
            LifecycleState::Error(raw) => raw.clone(),
            _ => ClusterStatus::Unknown.to_string(),
        };
        warn!(
            cluster = %self.handle.settings().identifier,
            %reported,
            wanted,
            "cluster status cannot be driven"
        );
        ClusterError::UnexpectedStatus {
            identifier: self.handle.settings().identifier.clone(),
            reported,
            wanted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::{ClusterInfo, ControlPlaneError, CreateClusterRequest, Endpoint};
    use crate::handle::ClusterSettings;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Answers describes from a script and counts every call.
    #[derive(Default)]
    struct FakePlane {
        script: RefCell<VecDeque<Result<&'static str, ControlPlaneError>>>,
        describe_calls: Cell<usize>,
        create_calls: Cell<usize>,
        delete_calls: Cell<usize>,
    }

    impl FakePlane {
        fn scripted(statuses: &[&'static str]) -> Self {
            let plane = Self::default();
            for s in statuses {
                plane.script.borrow_mut().push_back(Ok(s));
            }
            plane
        }
    }

    impl ControlPlane for FakePlane {
        fn describe_cluster(&self, id: &str) -> Result<ClusterInfo, ControlPlaneError> {
            self.describe_calls.set(self.describe_calls.get() + 1);
            let status = self
                .script
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(ControlPlaneError::Request("script exhausted".into())))?;
            Ok(ClusterInfo {
                identifier: id.to_string(),
                status: status.to_string(),
                node_type: "dc2.large".to_string(),
                node_count: 1,
                master_username: "nectar".to_string(),
                db_name: "honeypot".to_string(),
                endpoint: (status == "available").then(|| Endpoint {
                    address: "dwh.local".to_string(),
                    port: 5439,
                }),
                vpc_id: None,
            })
        }

        fn create_cluster(&self, _: &CreateClusterRequest) -> Result<(), ControlPlaneError> {
            self.create_calls.set(self.create_calls.get() + 1);
            Ok(())
        }

        fn delete_cluster(&self, _: &str, skip: bool) -> Result<(), ControlPlaneError> {
            assert!(skip, "final snapshot must be skipped");
            self.delete_calls.set(self.delete_calls.get() + 1);
            Ok(())
        }

        fn attach_role(&self, name: &str) -> Result<String, ControlPlaneError> {
            Ok(format!("arn:test:{name}"))
        }

        fn get_role(&self, name: &str) -> Result<String, ControlPlaneError> {
            Ok(format!("arn:test:{name}"))
        }
    }

    fn controller(plane: FakePlane) -> LifecycleController<FakePlane> {
        let settings = ClusterSettings {
            identifier: "dwh".to_string(),
            cluster_type: "single-node".to_string(),
            node_type: "dc2.large".to_string(),
            node_count: 1,
            db_name: "honeypot".to_string(),
            master_username: "nectar".to_string(),
            master_password: "secret".to_string(),
            port: 5439,
            role_name: "dwh-role".to_string(),
        };
        LifecycleController::new(ClusterHandle::new(settings, plane), Duration::ZERO)
    }

    fn plane(c: &LifecycleController<FakePlane>) -> &FakePlane {
        c.handle().control_plane()
    }

    #[test]
    fn ensure_available_polls_until_available() {
        let mut c = controller(FakePlane::scripted(&[
            "creating", "creating", "creating", "available",
        ]));

        let descriptor = c.ensure_available().unwrap();
        assert_eq!(plane(&c).describe_calls.get(), 4);
        assert_eq!(plane(&c).create_calls.get(), 0);
        assert_eq!(descriptor.status, ClusterStatus::Available);
        assert_eq!(descriptor.endpoint.as_deref(), Some("dwh.local"));
        assert_eq!(descriptor.role_arn.as_deref(), Some("arn:test:dwh-role"));
        assert_eq!(c.state(), &LifecycleState::Available);
    }

    #[test]
    fn ensure_available_returns_immediately_when_available() {
        let mut c = controller(FakePlane::scripted(&["available"]));
        let descriptor = c.ensure_available().unwrap();
        assert!(descriptor.is_available());
        assert_eq!(plane(&c).describe_calls.get(), 1);
    }

    #[test]
    fn ensure_available_rejects_deleting_without_polling() {
        let mut c = controller(FakePlane::scripted(&["deleting", "available"]));
        let err = c.ensure_available().unwrap_err();
        assert!(matches!(
            err,
            ClusterError::TransientConflict { status: ClusterStatus::Deleting, .. }
        ));
        assert_eq!(plane(&c).describe_calls.get(), 1);
    }

    #[test]
    fn ensure_available_creates_missing_cluster() {
        let plane_ = FakePlane::default();
        plane_
            .script
            .borrow_mut()
            .push_back(Err(ControlPlaneError::NotFound("dwh".into())));
        plane_.script.borrow_mut().push_back(Ok("creating"));
        plane_.script.borrow_mut().push_back(Ok("available"));
        let mut c = controller(plane_);

        let descriptor = c.ensure_available().unwrap();
        assert!(descriptor.is_available());
        assert_eq!(plane(&c).create_calls.get(), 1);
        assert_eq!(plane(&c).describe_calls.get(), 3);
    }

    #[test]
    fn ensure_available_rejects_unknown_status() {
        let mut c = controller(FakePlane::scripted(&["modifying"]));
        let err = c.ensure_available().unwrap_err();
        assert!(matches!(
            err,
            ClusterError::UnexpectedStatus { ref reported, wanted: "available", .. }
                if reported == "modifying"
        ));
        assert!(err.to_string().contains("reported status modifying"), "{err}");
        assert_eq!(c.state(), &LifecycleState::Error("modifying".to_string()));
    }

    #[test]
    fn ensure_deleted_reports_raw_status() {
        let mut c = controller(FakePlane::scripted(&["rebooting"]));
        match c.ensure_deleted() {
            Err(ClusterError::UnexpectedStatus { reported, wanted, .. }) => {
                assert_eq!(reported, "rebooting");
                assert_eq!(wanted, "deleted");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn poll_reports_pending_then_ready() {
        let mut c = controller(FakePlane::scripted(&["creating", "available"]));
        assert_eq!(
            c.poll().unwrap(),
            PollOutcome::Pending(ClusterStatus::Creating)
        );
        assert!(matches!(c.poll().unwrap(), PollOutcome::Ready(d) if d.is_available()));
    }

    #[test]
    fn ensure_deleted_deletes_available_cluster() {
        let mut c = controller(FakePlane::scripted(&["available"]));
        assert_eq!(c.ensure_deleted().unwrap(), LifecycleState::Deleting);
        assert_eq!(plane(&c).delete_calls.get(), 1);
        assert_eq!(c.handle().endpoint(), None);
    }

    #[test]
    fn ensure_deleted_is_idempotent() {
        let mut c = controller(FakePlane::scripted(&["deleting"]));
        assert_eq!(c.ensure_deleted().unwrap(), LifecycleState::Deleting);

        let plane_ = FakePlane::default();
        plane_
            .script
            .borrow_mut()
            .push_back(Err(ControlPlaneError::NotFound("dwh".into())));
        let mut c = controller(plane_);
        assert_eq!(c.ensure_deleted().unwrap(), LifecycleState::Deleted);
        assert_eq!(plane(&c).delete_calls.get(), 0);
    }

    #[test]
    fn ensure_deleted_rejects_creating_cluster() {
        let mut c = controller(FakePlane::scripted(&["creating"]));
        assert!(matches!(
            c.ensure_deleted(),
            Err(ClusterError::TransientConflict { status: ClusterStatus::Creating, .. })
        ));
    }

    #[test]
    fn status_maps_missing_cluster_to_deleted() {
        let plane_ = FakePlane::default();
        plane_
            .script
            .borrow_mut()
            .push_back(Err(ControlPlaneError::NotFound("dwh".into())));
        let mut c = controller(plane_);
        let descriptor = c.status().unwrap();
        assert_eq!(descriptor.status, ClusterStatus::Deleted);
        assert_eq!(c.state(), &LifecycleState::Deleted);
    }
}
