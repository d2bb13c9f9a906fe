use std::path::Path;

use anyhow::{Context, bail};
use tracing::debug;

use nectar_cluster::{
    ClusterHandle, ClusterSettings, LifecycleController, LocalControlPlane, LocalOptions,
};
use nectar_core::NectarConfig;
use nectar_core::config::ControlPlaneKind;

pub mod cluster;
pub mod etl;
pub mod ingest;
pub mod tables;

pub fn init(path: &Path, identifier: &str, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    let config = NectarConfig::scaffold(identifier);
    std::fs::write(path, config.to_toml_string()?)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("✓ Generated {}", path.display());
    Ok(())
}

pub(crate) fn load_config(path: &Path) -> anyhow::Result<NectarConfig> {
    debug!(path = %path.display(), "loading config");
    NectarConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))
}

pub(crate) fn control_plane(config: &NectarConfig) -> anyhow::Result<LocalControlPlane> {
    match config.control_plane.kind {
        ControlPlaneKind::Local => {
            let path = Path::new(&config.control_plane.state_path);
            LocalControlPlane::open(path, LocalOptions::from(&config.control_plane))
                .with_context(|| format!("opening control plane state {}", path.display()))
        }
    }
}

pub(crate) fn controller(
    config: &NectarConfig,
) -> anyhow::Result<LifecycleController<LocalControlPlane>> {
    let handle = ClusterHandle::new(ClusterSettings::from_config(config), control_plane(config)?);
    Ok(LifecycleController::new(handle, config.cluster.poll_interval()))
}

/// Describe the cluster and require it to be available with an endpoint.
/// Resolves the access role on the way.
pub(crate) fn ready_handle(
    config: &NectarConfig,
) -> anyhow::Result<ClusterHandle<LocalControlPlane>> {
    let mut ctl = controller(config)?;
    let descriptor = ctl.status()?;
    if !descriptor.is_available() {
        bail!("cannot connect to the database at this time; cluster is {descriptor}");
    }
    let mut handle = ctl.into_handle();
    handle.resolve_role()?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_config_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nectar.toml");

        init(&path, "dev-dwh", false).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.cluster.identifier, "dev-dwh");
        assert_eq!(config.sources.len(), 3);

        assert!(init(&path, "other", false).is_err());
        init(&path, "other", true).unwrap();
        assert_eq!(load_config(&path).unwrap().cluster.identifier, "other");
    }

    #[test]
    fn database_commands_refuse_a_missing_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NectarConfig::scaffold("dev-dwh");
        config.control_plane.state_path = dir
            .path()
            .join("state.redb")
            .to_string_lossy()
            .into_owned();

        let err = ready_handle(&config).err().unwrap();
        assert!(err.to_string().contains("deleted"), "{err}");
    }
}
