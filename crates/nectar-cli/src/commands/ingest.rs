use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use nectar_ingest::geo::load_ip_list;
use nectar_ingest::{
    GeoBatch, GeoBatchOptions, HttpGeoLookup, NormalizeStats, normalize_honeypot,
    normalize_reputation,
};

use super::load_config;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

fn open(input: &Path, output: &Path) -> anyhow::Result<(BufReader<File>, BufWriter<File>)> {
    let reader = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let writer = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    Ok((BufReader::new(reader), BufWriter::new(writer)))
}

fn report(output: &Path, stats: NormalizeStats) {
    println!(
        "✓ Wrote {} row(s) to {} ({} skipped, {} malformed)",
        stats.rows,
        output.display(),
        stats.skipped,
        stats.malformed
    );
}

pub fn honeypot(input: &Path, output: &Path) -> anyhow::Result<()> {
    let (reader, writer) = open(input, output)?;
    let stats = normalize_honeypot(reader, writer)?;
    report(output, stats);
    Ok(())
}

pub fn reputation(input: &Path, output: &Path) -> anyhow::Result<()> {
    let (reader, writer) = open(input, output)?;
    let stats = normalize_reputation(reader, writer)?;
    report(output, stats);
    Ok(())
}

pub fn geolocate(config_path: &Path, ip_list: &Path, output: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let lookup = HttpGeoLookup::new(&config.geolocation.base_url, LOOKUP_TIMEOUT)?;
    let batch = GeoBatch::new(lookup, GeoBatchOptions::from(&config.geolocation));

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let summary = runtime.block_on(async {
        let ips = load_ip_list(ip_list).await?;
        info!(ips = ips.len(), list = %ip_list.display(), "geolocating ip list");
        batch.run(&ips, output).await
    })?;

    println!(
        "✓ Geolocated {} new IP(s) into {} ({} already present)",
        summary.located,
        output.display(),
        summary.already_located
    );
    if !summary.failed.is_empty() {
        println!("  {} IP(s) failed:", summary.failed.len());
        for ip in &summary.failed {
            println!("    {ip}");
        }
    }
    Ok(())
}
