//! WhisperCtl - one entry point per command
//!
//! Every operation builds the metric index fresh from disk, resolves its
//! selectors against it, and hands the resulting set to the batch layer:
//!
//! ```text
//! WalkerConfig ──spawn_blocking──→ MetricIndex ──flatten──→ MetricSet
//!                                                              │
//!                                   SelectorSpec ──resolve─────┤
//!                                                              ↓
//!                                  BatchMutator (ArchiveTool) → BatchReport
//! ```
//!
//! Nothing is cached between calls; a second command sees archives created
//! since the first.

use std::sync::Arc;

use crate::archive::{AggregationMethod, ArchiveInfo, DumpSummary, XFilesFactor};
use crate::batch::{BatchMutator, BatchOptions, BatchReport, Inspection, Mutation};
use crate::config::Config;
use crate::error::{CtlError, CtlResult};
use crate::index::{MetricIndex, MetricLocator, MetricSet, WalkerConfig};
use crate::selector::SelectorSpec;
use crate::tools::{ArchiveTool, ResizeRequest};

/// Façade over indexing, selector resolution and batch mutation
#[derive(Clone)]
pub struct WhisperCtl {
    walker: WalkerConfig,
    locator: MetricLocator,
    tool: Arc<dyn ArchiveTool>,
    options: BatchOptions,
}

impl WhisperCtl {
    pub fn new(
        walker: WalkerConfig,
        locator: MetricLocator,
        tool: Arc<dyn ArchiveTool>,
        options: BatchOptions,
    ) -> Self {
        Self {
            walker,
            locator,
            tool,
            options,
        }
    }

    /// Wire up real subprocess tools from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.storage.walker_config(),
            config.storage.locator(),
            Arc::new(config.process_tool()),
            config.batch.options(),
        )
    }

    /// Builder method: report every mutation as skipped without running tools
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.options = self.options.with_dry_run(dry_run);
        self
    }

    pub fn walker_config(&self) -> &WalkerConfig {
        &self.walker
    }

    pub fn locator(&self) -> &MetricLocator {
        &self.locator
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    fn mutator(&self) -> BatchMutator {
        BatchMutator::new(self.locator.clone(), Arc::clone(&self.tool), self.options.clone())
    }

    /// Walk the storage root and build the index
    pub async fn index(&self) -> CtlResult<MetricIndex> {
        let config = self.walker.clone();
        let index = tokio::task::spawn_blocking(move || MetricIndex::build(&config))
            .await
            .map_err(|e| CtlError::Task(e.to_string()))??;

        let stats = index.stats();
        tracing::info!(
            metrics = stats.metrics,
            directories = stats.directories,
            rejected = stats.rejected,
            unreadable = stats.unreadable,
            "Indexed {:?}",
            self.walker.root
        );
        Ok(index)
    }

    /// Sorted metric names matching `spec`
    pub async fn search(&self, spec: &SelectorSpec) -> CtlResult<MetricSet> {
        let index = self.index().await?;
        let metrics = spec.resolve(&index.metric_set())?;
        tracing::debug!(selectors = %spec, matched = metrics.len(), "Resolved selectors");
        Ok(metrics)
    }

    pub async fn info(&self, spec: &SelectorSpec) -> CtlResult<Vec<Inspection<ArchiveInfo>>> {
        let metrics = self.search(spec).await?;
        Ok(self.mutator().info(&metrics).await)
    }

    pub async fn dump(&self, spec: &SelectorSpec) -> CtlResult<Vec<Inspection<DumpSummary>>> {
        let metrics = self.search(spec).await?;
        Ok(self.mutator().dump(&metrics).await)
    }

    /// Resolve `spec`, then apply `mutation` to every match
    pub async fn apply(&self, spec: &SelectorSpec, mutation: &Mutation) -> CtlResult<BatchReport> {
        let index = self.index().await?;
        Ok(self
            .mutator()
            .apply_selector(spec, &index.metric_set(), mutation)
            .await?)
    }

    pub async fn resize(&self, spec: &SelectorSpec, request: ResizeRequest) -> CtlResult<BatchReport> {
        self.apply(spec, &Mutation::resize(request)).await
    }

    pub async fn xff(&self, spec: &SelectorSpec, x_files_factor: XFilesFactor) -> CtlResult<BatchReport> {
        self.apply(spec, &Mutation::set_fill_factor(x_files_factor)).await
    }

    pub async fn agg(&self, spec: &SelectorSpec, method: AggregationMethod) -> CtlResult<BatchReport> {
        self.apply(spec, &Mutation::set_aggregation(method)).await
    }

    pub async fn clean(&self, spec: &SelectorSpec) -> CtlResult<BatchReport> {
        self.apply(spec, &Mutation::CleanBackups).await
    }

    /// Delete matching archives that are zero bytes long
    pub async fn remove_empty(&self, spec: &SelectorSpec) -> CtlResult<BatchReport> {
        self.apply(spec, &Mutation::RemoveEmpty).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::OutcomeStatus;
    use crate::index::IndexError;
    use crate::selector::SelectorError;
    use crate::tools::mock::{FakeTool, ToolCall};
    use crate::tools::ToolKind;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn setup(files: &[&str], tool: FakeTool) -> (TempDir, WhisperCtl, Arc<FakeTool>) {
        let dir = tempdir().unwrap();
        for f in files {
            touch(dir.path(), f);
        }
        let tool = Arc::new(tool);
        let ctl = WhisperCtl::new(
            WalkerConfig::new(dir.path()),
            MetricLocator::new(dir.path(), ".wsp"),
            tool.clone(),
            BatchOptions::default(),
        );
        (dir, ctl, tool)
    }

    #[tokio::test]
    async fn test_index_and_search() {
        let (_dir, ctl, _) = setup(
            &["a/b/c.wsp", "a/b/d.wsp", "a/b/c/e.wsp", "x/y.wsp", "notes.txt"],
            FakeTool::new(),
        );

        let index = ctl.index().await.unwrap();
        assert_eq!(index.len(), 4);

        let found = ctl.search(&SelectorSpec::single("a.*.c")).await.unwrap();
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["a.b.c"]);

        let found = ctl.search(&SelectorSpec::regex("^a\\.b")).await.unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn test_index_sees_new_archives() {
        let (dir, ctl, _) = setup(&["a.wsp"], FakeTool::new());
        assert_eq!(ctl.index().await.unwrap().len(), 1);

        touch(dir.path(), "b/c.wsp");
        let names = ctl.index().await.unwrap().flatten();
        assert!(names.contains(&"b.c".to_string()));
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let ctl = WhisperCtl::new(
            WalkerConfig::new(&missing),
            MetricLocator::new(&missing, ".wsp"),
            Arc::new(FakeTool::new()),
            BatchOptions::default(),
        );

        let err = ctl.clean(&SelectorSpec::single("*")).await.unwrap_err();
        assert!(matches!(err, CtlError::Index(IndexError::Filesystem { .. })));
    }

    #[tokio::test]
    async fn test_empty_root_gives_empty_report() {
        let (_dir, ctl, tool) = setup(&[], FakeTool::new());

        let report = ctl
            .agg(&SelectorSpec::single("*"), AggregationMethod::Sum)
            .await
            .unwrap();
        assert!(report.is_empty());
        assert!(tool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_regex_aborts_before_tools() {
        let (_dir, ctl, tool) = setup(&["a/b.wsp"], FakeTool::new());

        let err = ctl
            .agg(&SelectorSpec::new(vec!["a.*".into(), "[".into()], true), AggregationMethod::Max)
            .await
            .unwrap_err();
        assert!(matches!(err, CtlError::Selector(SelectorError::InvalidPattern { .. })));
        assert!(tool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resize_reports_each_metric() {
        let dir = tempdir().unwrap();
        for f in ["web/a.wsp", "web/b.wsp", "db/a.wsp"] {
            touch(dir.path(), f);
        }
        let tool = Arc::new(FakeTool::new().failing(
            ToolKind::Resize,
            dir.path().join("web/b.wsp"),
            "bad archive",
        ));
        let ctl = WhisperCtl::new(
            WalkerConfig::new(dir.path()),
            MetricLocator::new(dir.path(), ".wsp"),
            tool.clone(),
            BatchOptions::default(),
        );

        let request = ResizeRequest::parse(&["1m:1d"]).unwrap();
        let report = ctl.resize(&SelectorSpec::single("web.*"), request).await.unwrap();

        assert_eq!(report.len(), 2);
        assert!(report.get("web.a").unwrap().is_applied());
        assert_eq!(report.get("web.b").unwrap().status, OutcomeStatus::Failed);
        assert!(tool
            .calls()
            .iter()
            .all(|c| matches!(c, ToolCall::Resize(_, args) if args == &vec!["60:1440".to_string()])));
    }

    #[tokio::test]
    async fn test_xff_and_dry_run() {
        let info = "xFilesFactor: 0.5\n\nArchive 0\nsecondsPerPoint: 10\npoints: 8640\n";
        let (dir, ctl, tool) = setup(&["a/b.wsp"], FakeTool::new().with_default_info(info));

        let xff = XFilesFactor::new(0.25).unwrap();
        let dry = ctl.clone().with_dry_run(true).xff(&SelectorSpec::single("a.b"), xff).await.unwrap();
        assert_eq!(dry.skipped(), 1);
        assert!(tool.calls().is_empty());

        let report = ctl.xff(&SelectorSpec::single("a.b"), xff).await.unwrap();
        assert_eq!(report.applied(), 1);

        let archive = dir.path().join("a/b.wsp");
        assert_eq!(
            tool.calls(),
            vec![
                ToolCall::Info(archive.clone()),
                ToolCall::Resize(archive, vec!["--xFilesFactor=0.25".into(), "10:8640".into()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_info_and_clean() {
        let info = "aggregationMethod: max\n\nArchive 0\nsecondsPerPoint: 60\npoints: 60\n";
        let (dir, ctl, _) = setup(&["m/one.wsp", "m/two.wsp"], FakeTool::new().with_default_info(info));
        fs::write(dir.path().join("m/one.wsp.bak"), b"old").unwrap();

        let infos = ctl.info(&SelectorSpec::single("m.*")).await.unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(
            infos[0].data.as_ref().unwrap().aggregation_method(),
            Some(AggregationMethod::Max)
        );

        let report = ctl.clean(&SelectorSpec::single("m.*")).await.unwrap();
        assert!(report.get("m.one").unwrap().is_applied());
        assert_eq!(report.get("m.two").unwrap().status, OutcomeStatus::Skipped);
        assert!(!dir.path().join("m/one.wsp.bak").exists());
    }

    #[tokio::test]
    async fn test_remove_empty_archives() {
        let (dir, ctl, tool) = setup(&["m/empty.wsp", "m/full.wsp"], FakeTool::new());
        fs::write(dir.path().join("m/full.wsp"), b"header").unwrap();

        let report = ctl.remove_empty(&SelectorSpec::single("m.*")).await.unwrap();
        assert_eq!(report.applied(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(!dir.path().join("m/empty.wsp").exists());
        assert!(tool.calls().is_empty());

        let metrics = ctl.search(&SelectorSpec::single("m.*")).await.unwrap();
        assert_eq!(metrics.into_iter().collect::<Vec<_>>(), vec!["m.full".to_string()]);
    }
}
