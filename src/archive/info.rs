//! Info output parser
//!
//! The info tool prints blank-line separated stanzas of `key: value` lines:
//!
//! ```text
//! maxRetention: 31536000
//! xFilesFactor: 0.5
//! aggregationMethod: average
//! fileSize: 1728052
//!
//! Archive 0
//! retention: 86400
//! secondsPerPoint: 60
//! points: 1440
//! size: 17280
//! offset: 64
//! ```
//!
//! The first stanza is the header; every stanza that starts with `Archive`
//! describes one retention tier. Anything that doesn't fit is dropped, but
//! dropped `Archive` stanzas are counted so callers that must re-issue the
//! full retention list can refuse partial output.

use serde::Serialize;
use std::collections::BTreeMap;

use super::types::{AggregationMethod, RetentionStanza};

/// Parsed info tool output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchiveInfo {
    /// Header `key: value` pairs (maxRetention, xFilesFactor, ...)
    pub header: BTreeMap<String, String>,
    /// Retention tiers, most granular first
    pub archives: Vec<RetentionStanza>,
    /// `Archive` stanzas that could not be parsed
    pub skipped_archives: usize,
}

impl ArchiveInfo {
    /// Parse info output. Never fails: malformed stanzas are skipped.
    pub fn parse(output: &str) -> Self {
        let mut info = ArchiveInfo::default();

        for (i, stanza) in stanzas(output).into_iter().enumerate() {
            let is_archive = stanza
                .first()
                .map(|line| line.starts_with("Archive"))
                .unwrap_or(false);

            if is_archive {
                if let Some(retention) = parse_archive_stanza(&stanza) {
                    info.archives.push(retention);
                } else {
                    info.skipped_archives += 1;
                    tracing::debug!("Ignoring archive stanza without retention fields: {:?}", stanza);
                }
            } else if i == 0 {
                info.header.extend(stanza.iter().filter_map(|line| key_value(line)));
            }
        }

        info
    }

    /// Retention tiers in the order the tool reported them
    pub fn retentions(&self) -> &[RetentionStanza] {
        &self.archives
    }

    /// Every `Archive` stanza parsed into a retention tier
    pub fn is_complete(&self) -> bool {
        self.skipped_archives == 0
    }

    /// Retention tiers as `<secondsPerPoint>:<points>` resize arguments
    pub fn retention_args(&self) -> Vec<String> {
        self.archives.iter().map(RetentionStanza::to_arg).collect()
    }

    pub fn aggregation_method(&self) -> Option<AggregationMethod> {
        self.header.get("aggregationMethod")?.parse().ok()
    }

    pub fn x_files_factor(&self) -> Option<f64> {
        self.header.get("xFilesFactor")?.parse().ok()
    }

    pub fn max_retention(&self) -> Option<u64> {
        self.header.get("maxRetention")?.parse().ok()
    }

    pub fn file_size(&self) -> Option<u64> {
        self.header.get("fileSize")?.parse().ok()
    }
}

/// Split output into non-empty groups of trimmed lines
fn stanzas(output: &str) -> Vec<Vec<&str>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

fn key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

fn parse_archive_stanza(lines: &[&str]) -> Option<RetentionStanza> {
    let mut seconds_per_point = None;
    let mut points = None;

    for (key, value) in lines.iter().filter_map(|line| key_value(line)) {
        match key.as_str() {
            "secondsPerPoint" => seconds_per_point = value.parse::<u64>().ok(),
            "points" => points = value.parse::<u64>().ok(),
            _ => {}
        }
    }

    match (seconds_per_point?, points?) {
        (0, _) | (_, 0) => None,
        (spp, pts) => Some(RetentionStanza::new(spp, pts)),
    }
}
