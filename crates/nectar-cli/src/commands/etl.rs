use std::path::Path;

use nectar_catalog::{TableSelector, honeypot_catalog};
use nectar_etl::{DataQualityGate, EtlOrchestrator, LoadContext, PgConnector, Phase, PipelineRun};

use super::{load_config, ready_handle};

pub fn run(config_path: &Path, tables: Vec<String>, skip_checks: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let catalog = honeypot_catalog();
    catalog.validate(&config.sources)?;

    let selector = TableSelector::from_names(Some(tables));
    catalog.resolve(&selector)?;

    let handle = ready_handle(&config)?;
    let role_arn = handle
        .role_arn()
        .ok_or_else(|| anyhow::anyhow!("access role {} is not resolved", config.iam_role.name))?
        .to_string();
    let mut session = handle.open_session(&PgConnector)?;

    let load = LoadContext {
        role_arn,
        region: config.cluster.region.clone(),
        sources: config.sources.clone(),
    };
    let mut run = PipelineRun::new(selector);
    EtlOrchestrator::new(&catalog, session.as_mut(), load).populate(&mut run)?;
    println!(
        "✓ Loaded {} staging table(s), transformed {} table(s)",
        run.succeeded(Phase::Load).len(),
        run.succeeded(Phase::Transform).len()
    );

    if skip_checks {
        println!("  data-quality checks skipped");
        return Ok(());
    }
    let report = DataQualityGate::honeypot(&catalog).run(session.as_mut())?;
    println!(
        "✓ Data-quality checks passed ({} of {} fact rows have reputation data)",
        report.covered_rows, report.fact_rows
    );
    Ok(())
}

pub fn check(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let catalog = honeypot_catalog();
    let handle = ready_handle(&config)?;
    let mut session = handle.open_session(&PgConnector)?;

    let report = DataQualityGate::honeypot(&catalog).run(session.as_mut())?;
    for (table, rows) in &report.row_counts {
        println!("  {table:<24} {rows:>10}");
    }
    println!(
        "✓ Data-quality checks passed ({} of {} fact rows have reputation data)",
        report.covered_rows, report.fact_rows
    );
    Ok(())
}
