use std::path::Path;

use nectar_catalog::{TableSelector, honeypot_catalog};
use nectar_etl::{EtlOrchestrator, LoadContext, PgConnector, PipelineRun};

use super::{load_config, ready_handle};

pub fn reset(config_path: &Path, tables: Vec<String>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let catalog = honeypot_catalog();
    catalog.validate(&config.sources)?;

    let selector = TableSelector::from_names(Some(tables));
    catalog.resolve(&selector)?;

    let handle = ready_handle(&config)?;
    let mut session = handle.open_session(&PgConnector)?;
    let load = LoadContext {
        role_arn: handle.role_arn().unwrap_or_default().to_string(),
        region: config.cluster.region.clone(),
        sources: config.sources.clone(),
    };

    let mut run = PipelineRun::new(selector);
    EtlOrchestrator::new(&catalog, session.as_mut(), load).reset(&mut run)?;

    println!(
        "✓ Recreated {} table(s): {}",
        run.succeeded(nectar_etl::Phase::Create).len(),
        run.selector()
    );
    Ok(())
}
