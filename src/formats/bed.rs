//! BED text import.
//!
//! BED is 0-based and half-open; records are converted to 1-based closed
//! coordinates on the way in, so BED `chr1 0 100` becomes `chr1:1-100`.

use crate::record::{IntervalRecord, Strand};
use crate::{Error, Result};
use std::path::Path;

/// Standard names for BED columns 4 through 6.
pub const BED_COLUMNS: [&str; 3] = ["name", "score", "strand"];

pub async fn read_bed(path: impl AsRef<Path>) -> Result<Vec<IntervalRecord>> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
    parse_bed(&text)
}

pub fn parse_bed(text: &str) -> Result<Vec<IntervalRecord>> {
    let mut records = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if is_skippable(line) {
            continue;
        }
        records.push(parse_line(line).map_err(|msg| {
            Error::InvalidInput(format!("BED line {}: {}", i + 1, msg))
        })?);
    }
    Ok(records)
}

fn is_skippable(line: &str) -> bool {
    line.trim().is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

fn parse_line(line: &str) -> std::result::Result<IntervalRecord, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Err(format!("expected at least 3 columns, found {}", fields.len()));
    }

    let chrom = fields[0];
    if chrom.is_empty() {
        return Err("empty reference name".to_string());
    }
    let start: u64 = fields[1]
        .parse()
        .map_err(|_| format!("invalid start {:?}", fields[1]))?;
    let end: u64 = fields[2]
        .parse()
        .map_err(|_| format!("invalid end {:?}", fields[2]))?;
    if end <= start {
        return Err(format!("empty or inverted interval {}-{}", start, end));
    }

    let mut record = IntervalRecord::new(chrom, start + 1, end);

    if let Some(name) = fields.get(3).filter(|s| !s.is_empty() && **s != ".") {
        record.name = Some((*name).to_string());
    }
    if let Some(score) = fields.get(4).filter(|s| !s.is_empty() && **s != ".") {
        record.score = Some(
            score
                .parse()
                .map_err(|_| format!("invalid score {:?}", score))?,
        );
    }
    if let Some(strand) = fields.get(5) {
        record.strand =
            Strand::parse(strand).ok_or_else(|| format!("invalid strand {:?}", strand))?;
    }
    record.extra = fields
        .iter()
        .skip(6)
        .map(|s| (*s).to_string())
        .collect();

    Ok(record)
}
