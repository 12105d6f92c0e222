//! Dump output parser
//!
//! The dump tool emits one line per stored slot, `<slot>: <epoch>, <value>`,
//! grouped under `Archive N data:` headers. Slots with a timestamp of zero
//! or below have never been written and are ignored.

use chrono::{DateTime, Utc};
use nom::{
    character::complete::{char, digit1, space0, space1},
    combinator::{map_res, opt, recognize, rest},
    sequence::{pair, preceded, tuple},
    IResult,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// One non-null stored point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DumpPoint {
    /// Archive section the point came from, if the output had section headers
    pub archive: Option<usize>,
    /// Slot index within the archive
    pub slot: u64,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub value: f64,
}

impl DumpPoint {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Statistics derived from a dump
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DumpSummary {
    /// Non-null points in output order
    pub points: Vec<DumpPoint>,
    /// Non-null point count per archive section
    pub per_archive: BTreeMap<usize, usize>,
    /// Slot lines seen, including null ones
    pub total_slots: usize,
}

impl DumpSummary {
    /// Parse dump output. Lines that are not slot lines are skipped.
    pub fn parse(output: &str) -> Self {
        let mut summary = DumpSummary::default();
        let mut archive = None;

        for line in output.lines() {
            let line = line.trim();

            if let Some(idx) = archive_data_header(line) {
                archive = Some(idx);
                continue;
            }

            let Ok((_, (slot, timestamp, value))) = slot_line(line) else {
                continue;
            };
            let Ok(value) = value.trim().parse::<f64>() else {
                continue;
            };

            summary.total_slots += 1;
            if timestamp <= 0 {
                continue;
            }

            if let Some(idx) = archive {
                *summary.per_archive.entry(idx).or_insert(0) += 1;
            }
            summary.points.push(DumpPoint {
                archive,
                slot,
                timestamp,
                value,
            });
        }

        summary
    }

    pub fn non_null_count(&self) -> usize {
        self.points.len()
    }

    /// Earliest and latest non-null timestamps
    pub fn range(&self) -> Option<(i64, i64)> {
        let min = self.points.iter().map(|p| p.timestamp).min()?;
        let max = self.points.iter().map(|p| p.timestamp).max()?;
        Some((min, max))
    }

    pub fn range_utc(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.points.iter().min_by_key(|p| p.timestamp)?;
        let last = self.points.iter().max_by_key(|p| p.timestamp)?;
        Some((first.datetime()?, last.datetime()?))
    }
}

/// `Archive 3 data:` -> 3
fn archive_data_header(line: &str) -> Option<usize> {
    line.strip_prefix("Archive ")?
        .strip_suffix(" data:")?
        .trim()
        .parse()
        .ok()
}

fn unsigned(input: &str) -> IResult<&str, u64> {
    map_res(digit1, str::parse)(input)
}

fn signed(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse)(input)
}

/// `<slot>: <timestamp>, <value>`
fn slot_line(input: &str) -> IResult<&str, (u64, i64, &str)> {
    tuple((
        unsigned,
        preceded(pair(char(':'), space0), signed),
        preceded(tuple((space0, char(','), space1)), rest),
    ))(input)
}
