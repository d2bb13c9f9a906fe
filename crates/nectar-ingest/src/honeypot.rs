//! Honeypot export normalizer.
//!
//! Input is newline-delimited JSON as exported from an hpfeeds collector:
//! each line carries an envelope (`_id`, `ident`, `normalized`, `timestamp`,
//! `channel`) and a JSON-encoded `payload` whose shape depends on the
//! channel. Output is CSV in `staging_honeypot` column order with a header.

use std::io::{BufRead, Write};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::csv::write_record;
use crate::error::IngestResult;

/// `staging_honeypot` columns, in table order.
pub const COLUMNS: [&str; 21] = [
    "id",
    "ident",
    "normalized",
    "timestamp",
    "channel",
    "pattern",
    "filename",
    "request_raw",
    "request_url",
    "attackerIP",
    "attackerPort",
    "victimPort",
    "victimIP",
    "connectionType",
    "connectionProtocol",
    "priority",
    "header",
    "signature",
    "sensor",
    "connectionTransport",
    "remoteHostname",
];

/// Counts from one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub rows: usize,
    /// Well-formed lines from channels that have no mapping.
    pub skipped: usize,
    pub malformed: usize,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "_id")]
    id: Oid,
    ident: String,
    #[serde(default)]
    normalized: bool,
    timestamp: MongoDate,
    channel: String,
    payload: String,
}

#[derive(Deserialize)]
struct Oid {
    #[serde(rename = "$oid")]
    oid: String,
}

#[derive(Deserialize)]
struct MongoDate {
    #[serde(rename = "$date")]
    date: Value,
}

/// One `staging_honeypot` row; unset fields are written empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct HoneypotRow {
    id: String,
    ident: String,
    normalized: bool,
    timestamp: String,
    channel: String,
    pattern: String,
    filename: String,
    request_raw: String,
    request_url: String,
    attacker_ip: String,
    attacker_port: String,
    victim_port: String,
    victim_ip: String,
    connection_type: String,
    connection_protocol: String,
    priority: String,
    header: String,
    signature: String,
    sensor: String,
    connection_transport: String,
    remote_hostname: String,
}

impl HoneypotRow {
    fn fields(&self) -> [&str; 21] {
        [
            self.id.as_str(),
            self.ident.as_str(),
            if self.normalized { "true" } else { "false" },
            self.timestamp.as_str(),
            self.channel.as_str(),
            self.pattern.as_str(),
            self.filename.as_str(),
            self.request_raw.as_str(),
            self.request_url.as_str(),
            self.attacker_ip.as_str(),
            self.attacker_port.as_str(),
            self.victim_port.as_str(),
            self.victim_ip.as_str(),
            self.connection_type.as_str(),
            self.connection_protocol.as_str(),
            self.priority.as_str(),
            self.header.as_str(),
            self.signature.as_str(),
            self.sensor.as_str(),
            self.connection_transport.as_str(),
            self.remote_hostname.as_str(),
        ]
    }
}

/// Why a line could not be mapped.
#[derive(Debug, Error)]
enum LineError {
    #[error("invalid json: {0}")]
    Json(serde_json::Error),
    #[error("payload is missing {0}")]
    MissingField(&'static str),
}

/// Render a JSON scalar as a CSV field. Strings are unquoted, null is empty.
fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn required(payload: &Value, key: &'static str) -> Result<String, LineError> {
    payload
        .get(key)
        .map(scalar)
        .ok_or(LineError::MissingField(key))
}

/// Map one line. `Ok(None)` means the channel has no mapping.
fn parse_line(line: &str) -> Result<Option<HoneypotRow>, LineError> {
    let envelope: Envelope = serde_json::from_str(line).map_err(LineError::Json)?;

    let base = HoneypotRow {
        id: envelope.id.oid,
        ident: envelope.ident,
        normalized: envelope.normalized,
        timestamp: scalar(&envelope.timestamp.date),
        channel: envelope.channel.clone(),
        ..HoneypotRow::default()
    };

    let known = matches!(
        envelope.channel.as_str(),
        "glastopf.events" | "amun.events" | "dionaea.connections" | "snort.alerts"
    );
    if !known {
        return Ok(None);
    }
    let p: Value = serde_json::from_str(&envelope.payload).map_err(LineError::Json)?;

    let row = match envelope.channel.as_str() {
        "glastopf.events" => {
            let source = p.get("source").ok_or(LineError::MissingField("source"))?;
            HoneypotRow {
                pattern: required(&p, "pattern")?,
                filename: required(&p, "filename")?,
                request_raw: required(&p, "request_raw")?,
                request_url: required(&p, "request_url")?,
                attacker_ip: source
                    .get(0)
                    .map(scalar)
                    .ok_or(LineError::MissingField("source[0]"))?,
                attacker_port: source
                    .get(1)
                    .map(scalar)
                    .ok_or(LineError::MissingField("source[1]"))?,
                // glastopf only emulates a web server and does not report its own address.
                victim_port: "80".to_string(),
                victim_ip: "0".to_string(),
                ..base
            }
        }
        "amun.events" => HoneypotRow {
            attacker_ip: required(&p, "attackerIP")?,
            attacker_port: required(&p, "attackerPort")?,
            victim_ip: required(&p, "victimIP")?,
            victim_port: required(&p, "victimPort")?,
            connection_type: required(&p, "connectionType")?,
            ..base
        },
        "dionaea.connections" => HoneypotRow {
            attacker_ip: required(&p, "remote_host")?,
            attacker_port: required(&p, "remote_port")?,
            victim_ip: required(&p, "local_host")?,
            victim_port: required(&p, "local_port")?,
            connection_type: required(&p, "connection_type")?,
            connection_transport: required(&p, "connection_transport")?,
            connection_protocol: required(&p, "connection_protocol")?,
            remote_hostname: required(&p, "remote_hostname")?,
            ..base
        },
        _ => HoneypotRow {
            attacker_ip: required(&p, "source_ip")?,
            victim_ip: required(&p, "destination_ip")?,
            connection_type: required(&p, "classification")?,
            connection_protocol: required(&p, "proto")?,
            priority: required(&p, "priority")?,
            header: required(&p, "header")?,
            signature: required(&p, "signature")?,
            sensor: required(&p, "sensor")?,
            ..base
        },
    };
    Ok(Some(row))
}

/// Normalize an hpfeeds JSON export into `staging_honeypot` CSV.
///
/// Malformed lines are logged and counted, never fatal. Only I/O errors on
/// the reader or writer abort the pass.
pub fn normalize_honeypot<R: BufRead, W: Write>(
    input: R,
    mut output: W,
) -> IngestResult<NormalizeStats> {
    let mut stats = NormalizeStats::default();
    write_record(&mut output, &COLUMNS)?;

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(Some(row)) => {
                write_record(&mut output, &row.fields())?;
                stats.rows += 1;
            }
            Ok(None) => {
                debug!(line = index + 1, "unmapped channel; skipping");
                stats.skipped += 1;
            }
            Err(e) => {
                warn!(line = index + 1, error = %e, "malformed honeypot record");
                stats.malformed += 1;
            }
        }
    }

    output.flush()?;
    info!(
        rows = stats.rows,
        skipped = stats.skipped,
        malformed = stats.malformed,
        "honeypot export normalized"
    );
    Ok(stats)
}
