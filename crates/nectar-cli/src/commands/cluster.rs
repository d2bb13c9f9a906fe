use std::path::Path;

use super::{controller, load_config};

pub fn up(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut ctl = controller(&config)?;
    let descriptor = ctl.ensure_available()?;
    println!("✓ Cluster available: {descriptor}");
    Ok(())
}

pub fn down(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut ctl = controller(&config)?;
    let state = ctl.ensure_deleted()?;
    println!("✓ Cluster {}: {state:?}", config.cluster.identifier);
    Ok(())
}

pub fn status(config_path: &Path, format: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut ctl = controller(&config)?;
    let descriptor = ctl.status()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&descriptor)?),
        _ => println!("{descriptor}"),
    }
    Ok(())
}
