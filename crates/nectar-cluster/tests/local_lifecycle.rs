//! Lifecycle controller driving the redb-backed local control plane.

use std::time::Duration;

use nectar_cluster::{
    ClusterError, ClusterHandle, ClusterSettings, LifecycleController, LifecycleState,
    LocalControlPlane, LocalOptions, PollOutcome,
};
use nectar_core::ClusterStatus;

fn settings() -> ClusterSettings {
    ClusterSettings {
        identifier: "honeypot-dwh".to_string(),
        cluster_type: "single-node".to_string(),
        node_type: "dc2.large".to_string(),
        node_count: 1,
        db_name: "honeypot".to_string(),
        master_username: "nectar".to_string(),
        master_password: "hunter2".to_string(),
        port: 5432,
        role_name: "honeypot-s3-read".to_string(),
    }
}

fn options() -> LocalOptions {
    LocalOptions {
        endpoint_host: "db.local".to_string(),
        provisioning_polls: 2,
        deprovisioning_polls: 1,
    }
}

fn controller(plane: LocalControlPlane) -> LifecycleController<LocalControlPlane> {
    LifecycleController::new(ClusterHandle::new(settings(), plane), Duration::ZERO)
}

#[test]
fn provision_then_teardown() {
    let plane = LocalControlPlane::open_in_memory(options()).unwrap();
    let mut ctl = controller(plane.clone());

    let descriptor = ctl.ensure_available().unwrap();
    assert_eq!(descriptor.status, ClusterStatus::Available);
    assert_eq!(descriptor.endpoint.as_deref(), Some("db.local"));
    assert_eq!(
        descriptor.role_arn.as_deref(),
        Some("arn:nectar:iam::local:role/honeypot-s3-read")
    );

    let info = ctl.handle().connect_info().unwrap();
    assert_eq!(info.host, "db.local");
    assert_eq!(info.port, 5432);
    assert_eq!(info.dbname, "honeypot");

    // Second call finds the cluster already available.
    let again = ctl.ensure_available().unwrap();
    assert_eq!(again.endpoint, descriptor.endpoint);

    assert_eq!(ctl.ensure_deleted().unwrap(), LifecycleState::Deleting);
    assert!(ctl.handle().connect_info().is_err());

    // One describe still reports deleting, the next finds nothing.
    assert_eq!(ctl.status().unwrap().status, ClusterStatus::Deleting);
    assert_eq!(ctl.status().unwrap().status, ClusterStatus::Deleted);
    assert_eq!(ctl.ensure_deleted().unwrap(), LifecycleState::Deleted);
    assert!(plane.list_clusters().unwrap().is_empty());
}

#[test]
fn poll_reports_pending_until_available() {
    let plane = LocalControlPlane::open_in_memory(options()).unwrap();
    let mut handle = ClusterHandle::new(settings(), plane);
    handle.resolve_role().unwrap();
    handle.request_create().unwrap();

    let mut ctl = LifecycleController::new(handle, Duration::ZERO);
    assert_eq!(ctl.poll().unwrap(), PollOutcome::Pending(ClusterStatus::Creating));
    assert_eq!(ctl.poll().unwrap(), PollOutcome::Pending(ClusterStatus::Creating));
    match ctl.poll().unwrap() {
        PollOutcome::Ready(descriptor) => assert!(descriptor.is_available()),
        other => panic!("expected ready, got {other:?}"),
    }
}

#[test]
fn ensure_available_while_deleting_is_a_conflict() {
    let plane = LocalControlPlane::open_in_memory(options()).unwrap();
    let mut ctl = controller(plane.clone());
    ctl.ensure_available().unwrap();
    ctl.ensure_deleted().unwrap();

    let mut other = controller(plane);
    assert!(matches!(
        other.ensure_available(),
        Err(ClusterError::TransientConflict { .. })
    ));
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("control-plane.redb");

    {
        let plane = LocalControlPlane::open(&path, options()).unwrap();
        controller(plane).ensure_available().unwrap();
    }

    let plane = LocalControlPlane::open(&path, options()).unwrap();
    assert_eq!(plane.list_clusters().unwrap(), vec!["honeypot-dwh".to_string()]);

    let mut ctl = controller(plane);
    let descriptor = ctl.status().unwrap();
    assert_eq!(descriptor.status, ClusterStatus::Available);
    // The role was attached by the first process; resolving it again finds it.
    assert_eq!(
        ctl.handle_mut().resolve_role().unwrap(),
        "arn:nectar:iam::local:role/honeypot-s3-read"
    );
}
