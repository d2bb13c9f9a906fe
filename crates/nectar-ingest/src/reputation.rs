//! Reputation feed normalizer.
//!
//! The feed is `#`-delimited:
//! `ip#reliability#risk#type#country#locale#lat,long#extra`.
//! The coordinate pair is split into two columns and the trailing field is
//! dropped.

use std::io::{BufRead, Write};

use tracing::{info, warn};

use crate::csv::write_record;
use crate::error::IngestResult;
use crate::honeypot::NormalizeStats;

/// `staging_reputation` columns, in table order.
pub const COLUMNS: [&str; 8] = [
    "IP",
    "Reliability",
    "Risk",
    "Type",
    "Country",
    "Locale",
    "Latitude",
    "Longitude",
];

fn parse_line(line: &str) -> Option<[&str; 8]> {
    let parts: Vec<&str> = line.split('#').collect();
    if parts.len() < 7 || parts[0].trim().is_empty() {
        return None;
    }
    let (lat, long) = parts[6].split_once(',')?;
    Some([
        parts[0].trim(),
        parts[1].trim(),
        parts[2].trim(),
        parts[3].trim(),
        parts[4].trim(),
        parts[5].trim(),
        lat.trim(),
        long.trim(),
    ])
}

/// Normalize a reputation feed into `staging_reputation` CSV. Lines with
/// too few fields or no coordinate pair are counted as malformed.
pub fn normalize_reputation<R: BufRead, W: Write>(
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
            Some(fields) => {
                write_record(&mut output, &fields)?;
                stats.rows += 1;
            }
            None => {
                warn!(line = index + 1, "malformed reputation record");
                stats.malformed += 1;
            }
        }
    }

    output.flush()?;
    info!(rows = stats.rows, malformed = stats.malformed, "reputation feed normalized");
    Ok(stats)
}
