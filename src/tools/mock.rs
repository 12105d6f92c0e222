//! Fake archive tool for tests.
//!
//! Records every call and answers from per-archive scripts, so batch logic
//! can be exercised without spawning processes.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{ArchiveTool, ResizeRequest, ToolError, ToolKind, ToolResult};
use crate::archive::AggregationMethod;
use crate::index::MetricLocator;

/// One recorded invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Info(PathBuf),
    Dump(PathBuf),
    Resize(PathBuf, Vec<String>),
    SetAggregation(PathBuf, AggregationMethod),
}

impl ToolCall {
    pub fn archive(&self) -> &Path {
        match self {
            ToolCall::Info(p)
            | ToolCall::Dump(p)
            | ToolCall::Resize(p, _)
            | ToolCall::SetAggregation(p, _) => p,
        }
    }
}

/// Test double for [`ArchiveTool`]
#[derive(Default)]
pub struct FakeTool {
    calls: Mutex<Vec<ToolCall>>,
    /// Info output returned for every archive
    default_info: String,
    dump_output: HashMap<PathBuf, String>,
    /// (tool, archive) pairs that exit non-zero with the given message
    failures: HashMap<(ToolKind, PathBuf), String>,
    /// Archives whose calls time out
    timeouts: HashSet<PathBuf>,
    /// Write `<archive>.bak` on every resize, like the real tool
    write_backups: bool,
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_info(mut self, output: &str) -> Self {
        self.default_info = output.to_string();
        self
    }

    pub fn with_dump(mut self, archive: impl Into<PathBuf>, output: &str) -> Self {
        self.dump_output.insert(archive.into(), output.to_string());
        self
    }

    pub fn failing(mut self, tool: ToolKind, archive: impl Into<PathBuf>, message: &str) -> Self {
        self.failures.insert((tool, archive.into()), message.to_string());
        self
    }

    pub fn timing_out(mut self, archive: impl Into<PathBuf>) -> Self {
        self.timeouts.insert(archive.into());
        self
    }

    pub fn writing_backups(mut self) -> Self {
        self.write_backups = true;
        self
    }

    /// Calls in the order they were made
    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: ToolCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn scripted(&self, tool: ToolKind, archive: &Path) -> ToolResult<()> {
        if self.timeouts.contains(archive) {
            return Err(ToolError::Timeout {
                tool,
                after: std::time::Duration::from_secs(1),
            });
        }
        match self.failures.get(&(tool, archive.to_path_buf())) {
            Some(message) => Err(ToolError::ExitStatus {
                tool,
                code: Some(1),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ArchiveTool for FakeTool {
    async fn info(&self, archive: &Path) -> ToolResult<String> {
        self.record(ToolCall::Info(archive.to_path_buf()));
        self.scripted(ToolKind::Info, archive)?;
        Ok(self.default_info.clone())
    }

    async fn dump(&self, archive: &Path) -> ToolResult<String> {
        self.record(ToolCall::Dump(archive.to_path_buf()));
        self.scripted(ToolKind::Dump, archive)?;
        Ok(self.dump_output.get(archive).cloned().unwrap_or_default())
    }

    async fn resize(&self, archive: &Path, request: &ResizeRequest) -> ToolResult<()> {
        self.record(ToolCall::Resize(archive.to_path_buf(), request.args()));
        if self.write_backups {
            let _ = std::fs::write(MetricLocator::backup_path(archive), b"backup");
        }
        self.scripted(ToolKind::Resize, archive)
    }

    async fn set_aggregation(&self, archive: &Path, method: AggregationMethod) -> ToolResult<()> {
        self.record(ToolCall::SetAggregation(archive.to_path_buf(), method));
        self.scripted(ToolKind::SetAggregation, archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_records_and_replays() {
        let tool = FakeTool::new()
            .with_default_info("xFilesFactor: 0.5")
            .failing(ToolKind::Resize, "/a.wsp", "nope");

        assert_eq!(tool.info(Path::new("/a.wsp")).await.unwrap(), "xFilesFactor: 0.5");

        let request = ResizeRequest::parse(&["60:10"]).unwrap();
        assert!(tool.resize(Path::new("/a.wsp"), &request).await.is_err());
        assert!(tool.resize(Path::new("/b.wsp"), &request).await.is_ok());

        assert_eq!(
            tool.calls(),
            vec![
                ToolCall::Info("/a.wsp".into()),
                ToolCall::Resize("/a.wsp".into(), vec!["60:10".into()]),
                ToolCall::Resize("/b.wsp".into(), vec!["60:10".into()]),
            ]
        );
    }
}
