//! Per-metric results of a batch run

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// What happened to one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Tool ran and reported success
    Applied,
    /// Nothing was done (archive missing, dry run, nothing to clean)
    Skipped,
    /// Tool failed, timed out, or could not be launched
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Applied => write!(f, "applied"),
            OutcomeStatus::Skipped => write!(f, "skipped"),
            OutcomeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Result for a single metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationOutcome {
    pub metric: String,
    /// Archive path the metric resolved to
    pub path: Option<PathBuf>,
    pub status: OutcomeStatus,
    pub message: Option<String>,
}

impl MutationOutcome {
    pub fn applied(metric: impl Into<String>, path: PathBuf) -> Self {
        Self {
            metric: metric.into(),
            path: Some(path),
            status: OutcomeStatus::Applied,
            message: None,
        }
    }

    pub fn skipped(metric: impl Into<String>, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            path,
            status: OutcomeStatus::Skipped,
            message: Some(message.into()),
        }
    }

    pub fn failed(metric: impl Into<String>, path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            path: Some(path),
            status: OutcomeStatus::Failed,
            message: Some(message.into()),
        }
    }

    /// Builder method: attach a message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_applied(&self) -> bool {
        self.status == OutcomeStatus::Applied
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}

/// All outcomes of one batch, sorted by metric name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<MutationOutcome>,
}

impl BatchReport {
    /// Build a report; outcomes are re-sorted by metric name
    pub fn new(mut outcomes: Vec<MutationOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.metric.cmp(&b.metric));
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(MutationOutcome::is_failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &MutationOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn get(&self, metric: &str) -> Option<&MutationOutcome> {
        self.outcomes.iter().find(|o| o.metric == metric)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} metrics: {} applied, {} skipped, {} failed",
            self.len(),
            self.applied(),
            self.skipped(),
            self.failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_sorts_and_counts() {
        let report = BatchReport::new(vec![
            MutationOutcome::failed("c", "/c.wsp".into(), "boom"),
            MutationOutcome::applied("a", "/a.wsp".into()),
            MutationOutcome::skipped("b", None, "archive not found"),
        ]);

        let metrics: Vec<_> = report.outcomes.iter().map(|o| o.metric.as_str()).collect();
        assert_eq!(metrics, vec!["a", "b", "c"]);
        assert_eq!((report.applied(), report.skipped(), report.failed()), (1, 1, 1));
        assert!(report.has_failures());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.to_string(), "3 metrics: 1 applied, 1 skipped, 1 failed");
    }

    #[test]
    fn test_empty_report() {
        let report = BatchReport::default();
        assert!(report.is_empty());
        assert!(!report.has_failures());
        assert_eq!(report.to_string(), "0 metrics: 0 applied, 0 skipped, 0 failed");
    }

    #[test]
    fn test_outcome_serializes_lowercase_status() {
        let outcome = MutationOutcome::applied("a.b", "/x/a/b.wsp".into());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "applied");
        assert_eq!(json["metric"], "a.b");
    }
}
