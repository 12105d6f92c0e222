//! Read-only batch operations: info and dump
//!
//! Same fan-out and failure policy as mutations, but nothing is written and
//! no backup cleanup happens.

use serde::Serialize;
use std::path::PathBuf;

use super::mutator::BatchMutator;
use super::outcome::OutcomeStatus;
use crate::archive::{ArchiveInfo, DumpSummary};
use crate::index::MetricSet;

/// Per-metric result of a read-only tool call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection<T> {
    pub metric: String,
    pub path: PathBuf,
    /// `Applied` when data was read, `Skipped` when the archive is missing
    pub status: OutcomeStatus,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> Inspection<T> {
    fn ok(metric: &str, path: PathBuf, data: T) -> Self {
        Self {
            metric: metric.to_string(),
            path,
            status: OutcomeStatus::Applied,
            data: Some(data),
            message: None,
        }
    }

    fn not_ok(metric: &str, path: PathBuf, status: OutcomeStatus, message: String) -> Self {
        Self {
            metric: metric.to_string(),
            path,
            status,
            data: None,
            message: Some(message),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

impl BatchMutator {
    /// Run the info tool for every metric and parse the output
    pub async fn info(&self, metrics: &MetricSet) -> Vec<Inspection<ArchiveInfo>> {
        let mut results = self
            .for_each_bounded(metrics, move |metric| async move {
                let path = match self.locator().locate_existing(metric) {
                    Ok(path) => path,
                    Err(e) => {
                        return Inspection::not_ok(
                            metric,
                            self.locator().locate(metric),
                            OutcomeStatus::Skipped,
                            e.to_string(),
                        )
                    }
                };
                match self.tool().info(&path).await {
                    Ok(output) => Inspection::ok(metric, path, ArchiveInfo::parse(&output)),
                    Err(e) => {
                        tracing::warn!(metric, "Info failed: {}", e);
                        Inspection::not_ok(metric, path, OutcomeStatus::Failed, e.to_string())
                    }
                }
            })
            .await;
        results.sort_by(|a, b| a.metric.cmp(&b.metric));
        results
    }

    /// Run the dump tool for every metric and summarize non-null points
    pub async fn dump(&self, metrics: &MetricSet) -> Vec<Inspection<DumpSummary>> {
        let mut results = self
            .for_each_bounded(metrics, move |metric| async move {
                let path = match self.locator().locate_existing(metric) {
                    Ok(path) => path,
                    Err(e) => {
                        return Inspection::not_ok(
                            metric,
                            self.locator().locate(metric),
                            OutcomeStatus::Skipped,
                            e.to_string(),
                        )
                    }
                };
                match self.tool().dump(&path).await {
                    Ok(output) => Inspection::ok(metric, path, DumpSummary::parse(&output)),
                    Err(e) => {
                        tracing::warn!(metric, "Dump failed: {}", e);
                        Inspection::not_ok(metric, path, OutcomeStatus::Failed, e.to_string())
                    }
                }
            })
            .await;
        results.sort_by(|a, b| a.metric.cmp(&b.metric));
        results
    }
}
