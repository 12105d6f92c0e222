//! Batch Mutator
//!
//! Applies one `Mutation` to every metric in a set:
//!
//! ```text
//! metric → locate archive ─ missing ──────────────────────→ skipped
//!                         └ found → invoke tool(s) ─ ok ───→ applied
//!                                         │        └ err ──→ failed
//!                                         └ remove <archive>.bak (always)
//! ```
//!
//! Every metric is attempted even when others fail. Up to `concurrency`
//! metrics are in flight at once; the report is sorted by metric name
//! whatever order they finish in.

use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use super::mutation::Mutation;
use super::outcome::{BatchReport, MutationOutcome};
use crate::archive::{ArchiveInfo, XFilesFactor};
use crate::index::{MetricLocator, MetricSet};
use crate::selector::{SelectorResult, SelectorSpec};
use crate::tools::{ArchiveTool, ResizeRequest};

/// Batch execution settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum metrics processed at once (at least 1)
    pub concurrency: usize,
    /// Resolve and locate only; never invoke tools
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            dry_run: false,
        }
    }
}

impl BatchOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Applies mutations across many archives through an [`ArchiveTool`]
pub struct BatchMutator {
    locator: MetricLocator,
    tool: Arc<dyn ArchiveTool>,
    options: BatchOptions,
}

impl BatchMutator {
    pub fn new(locator: MetricLocator, tool: Arc<dyn ArchiveTool>, options: BatchOptions) -> Self {
        Self {
            locator,
            tool,
            options,
        }
    }

    pub fn locator(&self) -> &MetricLocator {
        &self.locator
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    pub(crate) fn tool(&self) -> &dyn ArchiveTool {
        self.tool.as_ref()
    }

    /// Resolve `spec` against `index`, then apply `mutation` to every match
    pub async fn apply_selector(
        &self,
        spec: &SelectorSpec,
        index: &MetricSet,
        mutation: &Mutation,
    ) -> SelectorResult<BatchReport> {
        let metrics = spec.resolve(index)?;
        Ok(self.apply(&metrics, mutation).await)
    }

    /// Apply `mutation` to every metric; never stops early
    pub async fn apply(&self, metrics: &MetricSet, mutation: &Mutation) -> BatchReport {
        let span = tracing::info_span!(
            "batch",
            id = %Uuid::new_v4(),
            mutation = %mutation,
            dry_run = self.options.dry_run
        );

        async {
            tracing::info!("Applying to {} metrics", metrics.len());

            let outcomes = self
                .for_each_bounded(metrics, move |metric| self.apply_one(metric, mutation))
                .await;
            let report = BatchReport::new(outcomes);

            if report.has_failures() {
                tracing::warn!("Batch finished with failures: {}", report);
            } else {
                tracing::info!("Batch finished: {}", report);
            }
            report
        }
        .instrument(span)
        .await
    }

    /// Run `f` for every metric with at most `concurrency` in flight
    pub(crate) async fn for_each_bounded<'a, F, Fut, T>(&'a self, metrics: &'a MetricSet, f: F) -> Vec<T>
    where
        F: Fn(&'a str) -> Fut,
        Fut: Future<Output = T> + 'a,
    {
        stream::iter(metrics.iter())
            .map(|metric| f(metric.as_str()))
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await
    }

    async fn apply_one(&self, metric: &str, mutation: &Mutation) -> MutationOutcome {
        let path = match self.locator.locate_existing(metric) {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(metric, "{}", err);
                return MutationOutcome::skipped(
                    metric,
                    Some(self.locator.locate(metric)),
                    "archive not found",
                );
            }
        };

        if self.options.dry_run {
            return MutationOutcome::skipped(metric, Some(path), "dry run");
        }

        let result = match mutation {
            Mutation::Resize(request) => self
                .tool
                .resize(&path, request)
                .await
                .map_err(|e| e.to_string()),
            Mutation::SetAggregation { method } => self
                .tool
                .set_aggregation(&path, *method)
                .await
                .map_err(|e| e.to_string()),
            Mutation::SetFillFactor { x_files_factor } => {
                self.set_fill_factor(&path, *x_files_factor).await
            }
            Mutation::CleanBackups => return clean_backup(metric, path).await,
            Mutation::RemoveEmpty => return remove_empty(metric, path).await,
        };

        remove_backup(metric, &path).await;

        match result {
            Ok(()) => {
                tracing::debug!(metric, "Applied");
                MutationOutcome::applied(metric, path)
            }
            Err(message) => {
                tracing::warn!(metric, "Failed: {}", message);
                MutationOutcome::failed(metric, path, message)
            }
        }
    }

    /// Query current retentions, then resize with them plus the new factor
    async fn set_fill_factor(&self, path: &Path, x_files_factor: XFilesFactor) -> Result<(), String> {
        let output = self
            .tool
            .info(path)
            .await
            .map_err(|e| format!("info query failed: {}", e))?;

        let info = ArchiveInfo::parse(&output);
        let request = ResizeRequest::preserving(&info, x_files_factor)
            .map_err(|e| format!("cannot derive retentions from info output: {}", e))?;

        self.tool
            .resize(path, &request)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Best-effort removal of the resize backup; only unexpected errors are logged
async fn remove_backup(metric: &str, archive: &Path) {
    let backup = MetricLocator::backup_path(archive);
    match tokio::fs::remove_file(&backup).await {
        Ok(()) => tracing::debug!(metric, backup = ?backup, "Removed backup"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(metric, backup = ?backup, "Failed to remove backup: {}", e),
    }
}

async fn clean_backup(metric: &str, archive: PathBuf) -> MutationOutcome {
    let backup = MetricLocator::backup_path(&archive);
    match tokio::fs::remove_file(&backup).await {
        Ok(()) => MutationOutcome::applied(metric, archive).message(format!("removed {}", backup.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            MutationOutcome::skipped(metric, Some(archive), "no backup present")
        }
        Err(e) => MutationOutcome::failed(
            metric,
            archive,
            format!("cannot remove {}: {}", backup.display(), e),
        ),
    }
}

/// Delete the archive only if it is zero bytes long
async fn remove_empty(metric: &str, archive: PathBuf) -> MutationOutcome {
    let len = match tokio::fs::metadata(&archive).await {
        Ok(meta) => meta.len(),
        Err(e) => return MutationOutcome::failed(metric, archive, format!("cannot stat archive: {}", e)),
    };
    if len > 0 {
        return MutationOutcome::skipped(metric, Some(archive), "archive not empty");
    }

    match tokio::fs::remove_file(&archive).await {
        Ok(()) => {
            tracing::info!(metric, archive = ?archive, "Deleted empty archive");
            MutationOutcome::applied(metric, archive).message("deleted empty archive")
        }
        Err(e) => MutationOutcome::failed(metric, archive, format!("cannot remove empty archive: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::AggregationMethod;
    use crate::batch::OutcomeStatus;
    use crate::tools::mock::{FakeTool, ToolCall};
    use crate::tools::ToolKind;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const INFO: &str = "maxRetention: 604800
xFilesFactor: 0.5
aggregationMethod: average

Archive 0
secondsPerPoint: 60
points: 1440

Archive 1
secondsPerPoint: 3600
points: 168
";

    fn storage(metrics: &[&str]) -> (TempDir, MetricLocator, MetricSet) {
        let dir = tempdir().unwrap();
        let locator = MetricLocator::new(dir.path(), ".wsp");
        for m in metrics {
            let path = locator.path_for(m);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"").unwrap();
        }
        let set = metrics.iter().map(|s| s.to_string()).collect();
        (dir, locator, set)
    }

    fn mutator(locator: &MetricLocator, tool: Arc<FakeTool>) -> BatchMutator {
        BatchMutator::new(locator.clone(), tool, BatchOptions::default())
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_stop_batch() {
        let (_dir, locator, metrics) = storage(&["a.one", "a.two", "a.three"]);
        let tool = Arc::new(FakeTool::new().failing(
            ToolKind::SetAggregation,
            locator.path_for("a.two"),
            "Traceback: corrupt header",
        ));

        let report = mutator(&locator, tool.clone())
            .apply(&metrics, &Mutation::set_aggregation(AggregationMethod::Max))
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.applied(), 2);
        assert_eq!(report.failed(), 1);

        let failed = report.get("a.two").unwrap();
        assert_eq!(failed.status, OutcomeStatus::Failed);
        assert!(failed.message.as_deref().unwrap().contains("Traceback: corrupt header"));
        assert!(report.get("a.one").unwrap().is_applied());
        assert!(report.get("a.three").unwrap().is_applied());

        assert_eq!(tool.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_outcomes_sorted_by_metric() {
        let names: Vec<String> = (0..20).map(|i| format!("m.n{:02}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (_dir, locator, metrics) = storage(&refs);
        let tool = Arc::new(FakeTool::new());

        let report = BatchMutator::new(
            locator.clone(),
            tool,
            BatchOptions::default().with_concurrency(8),
        )
        .apply(&metrics, &Mutation::set_aggregation(AggregationMethod::Sum))
        .await;

        let order: Vec<_> = report.outcomes.iter().map(|o| o.metric.clone()).collect();
        assert_eq!(order, names);
    }

    #[tokio::test]
    async fn test_missing_archive_is_skipped() {
        let (_dir, locator, mut metrics) = storage(&["a.present"]);
        metrics.insert("a.absent".to_string());
        let tool = Arc::new(FakeTool::new());

        let report = mutator(&locator, tool.clone())
            .apply(&metrics, &Mutation::set_aggregation(AggregationMethod::Last))
            .await;

        let skipped = report.get("a.absent").unwrap();
        assert_eq!(skipped.status, OutcomeStatus::Skipped);
        assert_eq!(skipped.path, Some(locator.path_for("a.absent")));
        assert_eq!(tool.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fill_factor_reissues_current_retentions() {
        let (_dir, locator, metrics) = storage(&["a.b"]);
        let tool = Arc::new(FakeTool::new().with_default_info(INFO));

        let xff = XFilesFactor::new(0.1).unwrap();
        let report = mutator(&locator, tool.clone())
            .apply(&metrics, &Mutation::set_fill_factor(xff))
            .await;

        assert_eq!(report.applied(), 1);
        let path = locator.path_for("a.b");
        assert_eq!(
            tool.calls(),
            vec![
                ToolCall::Info(path.clone()),
                ToolCall::Resize(
                    path,
                    vec!["--xFilesFactor=0.1".into(), "60:1440".into(), "3600:168".into()]
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_fill_factor_info_failure_skips_resize() {
        let (_dir, locator, metrics) = storage(&["a.bad", "a.good"]);
        let tool = Arc::new(
            FakeTool::new()
                .with_default_info(INFO)
                .failing(ToolKind::Info, locator.path_for("a.bad"), "cannot open"),
        );

        let report = mutator(&locator, tool.clone())
            .apply(&metrics, &Mutation::set_fill_factor(XFilesFactor::new(0.0).unwrap()))
            .await;

        assert!(report.get("a.bad").unwrap().is_failed());
        assert!(report.get("a.good").unwrap().is_applied());

        let resized: Vec<_> = tool
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ToolCall::Resize(..)))
            .map(|c| c.archive().to_path_buf())
            .collect();
        assert_eq!(resized, vec![locator.path_for("a.good")]);
    }

    #[tokio::test]
    async fn test_fill_factor_unparseable_info_fails() {
        let (_dir, locator, metrics) = storage(&["a.b"]);
        let tool = Arc::new(FakeTool::new().with_default_info("garbage"));

        let report = mutator(&locator, tool.clone())
            .apply(&metrics, &Mutation::set_fill_factor(XFilesFactor::new(0.5).unwrap()))
            .await;

        assert!(report.get("a.b").unwrap().is_failed());
        assert_eq!(tool.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fill_factor_partial_info_fails_without_resize() {
        let (_dir, locator, metrics) = storage(&["a.b"]);
        let info = INFO.replace("points: 168", "points: ???");
        let tool = Arc::new(FakeTool::new().with_default_info(&info));

        let report = mutator(&locator, tool.clone())
            .apply(&metrics, &Mutation::set_fill_factor(XFilesFactor::new(0.1).unwrap()))
            .await;

        let outcome = report.get("a.b").unwrap();
        assert!(outcome.is_failed());
        assert!(outcome
            .message
            .as_deref()
            .unwrap()
            .contains("Partial retention info"));
        assert_eq!(tool.calls(), vec![ToolCall::Info(locator.path_for("a.b"))]);
    }

    #[tokio::test]
    async fn test_backup_removed_after_success_and_failure() {
        let (_dir, locator, metrics) = storage(&["a.ok", "a.fail"]);
        let tool = Arc::new(
            FakeTool::new()
                .writing_backups()
                .failing(ToolKind::Resize, locator.path_for("a.fail"), "disk full"),
        );

        let request = ResizeRequest::parse(&["60:1440"]).unwrap();
        let report = mutator(&locator, tool)
            .apply(&metrics, &Mutation::resize(request))
            .await;

        assert_eq!(report.applied(), 1);
        assert_eq!(report.failed(), 1);
        for m in ["a.ok", "a.fail"] {
            let backup = MetricLocator::backup_path(&locator.path_for(m));
            assert!(!backup.exists(), "{} still has a backup", m);
        }
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let (_dir, locator, metrics) = storage(&["a.slow", "a.fast"]);
        let tool = Arc::new(FakeTool::new().timing_out(locator.path_for("a.slow")));

        let report = mutator(&locator, tool)
            .apply(&metrics, &Mutation::set_aggregation(AggregationMethod::Min))
            .await;

        let slow = report.get("a.slow").unwrap();
        assert!(slow.is_failed());
        assert!(slow.message.as_deref().unwrap().contains("timed out"));
        assert!(report.get("a.fast").unwrap().is_applied());
    }

    #[tokio::test]
    async fn test_dry_run_invokes_nothing() {
        let (_dir, locator, metrics) = storage(&["a.b", "a.c"]);
        let tool = Arc::new(FakeTool::new());

        let report = BatchMutator::new(
            locator.clone(),
            tool.clone(),
            BatchOptions::default().with_dry_run(true),
        )
        .apply(&metrics, &Mutation::set_aggregation(AggregationMethod::Sum))
        .await;

        assert_eq!(report.skipped(), 2);
        assert!(tool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_clean_backups() {
        let (_dir, locator, metrics) = storage(&["a.dirty", "a.clean"]);
        let dirty = MetricLocator::backup_path(&locator.path_for("a.dirty"));
        fs::write(&dirty, b"old").unwrap();
        let tool = Arc::new(FakeTool::new());

        let report = mutator(&locator, tool.clone())
            .apply(&metrics, &Mutation::CleanBackups)
            .await;

        assert!(report.get("a.dirty").unwrap().is_applied());
        assert_eq!(report.get("a.clean").unwrap().status, OutcomeStatus::Skipped);
        assert!(!dirty.exists());
        assert!(tool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_empty_deletes_only_zero_length_archives() {
        let (_dir, locator, metrics) = storage(&["a.empty", "a.full"]);
        fs::write(locator.path_for("a.full"), b"header").unwrap();
        let tool = Arc::new(FakeTool::new());

        let dry = BatchMutator::new(
            locator.clone(),
            tool.clone(),
            BatchOptions::default().with_dry_run(true),
        )
        .apply(&metrics, &Mutation::RemoveEmpty)
        .await;
        assert_eq!(dry.skipped(), 2);
        assert!(locator.path_for("a.empty").exists());

        let report = mutator(&locator, tool.clone())
            .apply(&metrics, &Mutation::RemoveEmpty)
            .await;

        assert!(report.get("a.empty").unwrap().is_applied());
        let full = report.get("a.full").unwrap();
        assert_eq!(full.status, OutcomeStatus::Skipped);
        assert_eq!(full.message.as_deref(), Some("archive not empty"));
        assert!(!locator.path_for("a.empty").exists());
        assert!(locator.path_for("a.full").exists());
        assert!(tool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_set_is_empty_report() {
        let (_dir, locator, metrics) = storage(&[]);
        let report = mutator(&locator, Arc::new(FakeTool::new()))
            .apply(&metrics, &Mutation::CleanBackups)
            .await;
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_apply_selector_resolves_first() {
        let (_dir, locator, metrics) = storage(&["web.a", "web.b", "db.a"]);
        let tool = Arc::new(FakeTool::new());

        let report = mutator(&locator, tool.clone())
            .apply_selector(
                &SelectorSpec::single("web.*"),
                &metrics,
                &Mutation::set_aggregation(AggregationMethod::Max),
            )
            .await
            .unwrap();

        let touched: Vec<_> = report.outcomes.iter().map(|o| o.metric.as_str()).collect();
        assert_eq!(touched, vec!["web.a", "web.b"]);

        let err = mutator(&locator, tool)
            .apply_selector(
                &SelectorSpec::regex("(oops"),
                &metrics,
                &Mutation::CleanBackups,
            )
            .await;
        assert!(err.is_err());
    }
}
