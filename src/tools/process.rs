//! Subprocess-backed archive tool
//!
//! Every call spawns the configured script with the archive path as the
//! first argument. A child that outlives the timeout is killed.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{ArchiveTool, ResizeRequest, ToolError, ToolKind, ToolResult};
use crate::archive::AggregationMethod;

/// Program paths for each tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub info: PathBuf,
    pub dump: PathBuf,
    pub resize: PathBuf,
    pub set_aggregation: PathBuf,
}

impl ToolPaths {
    /// Standard Whisper script names inside `bin_dir`
    pub fn in_dir(bin_dir: &Path) -> Self {
        Self {
            info: bin_dir.join("whisper-info.py"),
            dump: bin_dir.join("whisper-dump.py"),
            resize: bin_dir.join("whisper-resize.py"),
            set_aggregation: bin_dir.join("whisper-set-aggregation-method.py"),
        }
    }

    pub fn get(&self, kind: ToolKind) -> &Path {
        match kind {
            ToolKind::Info => &self.info,
            ToolKind::Dump => &self.dump,
            ToolKind::Resize => &self.resize,
            ToolKind::SetAggregation => &self.set_aggregation,
        }
    }
}

/// Runs the real tools as child processes
#[derive(Debug, Clone)]
pub struct ProcessTool {
    paths: ToolPaths,
    timeout: Option<Duration>,
}

impl ProcessTool {
    pub fn new(paths: ToolPaths) -> Self {
        Self {
            paths,
            timeout: None,
        }
    }

    /// Kill and fail any invocation running longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn run(&self, kind: ToolKind, archive: &Path, extra: Vec<OsString>) -> ToolResult<String> {
        let program = self.paths.get(kind);

        let mut command = Command::new(program);
        command
            .arg(archive)
            .args(&extra)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(tool = %kind, program = ?program, archive = ?archive, args = ?extra, "Invoking tool");

        let child = command.spawn().map_err(|source| ToolError::Launch {
            tool: kind,
            program: program.to_path_buf(),
            source,
        })?;

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ToolError::Timeout {
                    tool: kind,
                    after: limit,
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| ToolError::Io { tool: kind, source })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            stderr.into_owned()
        };

        Err(ToolError::ExitStatus {
            tool: kind,
            code: output.status.code(),
            message,
        })
    }
}

#[async_trait]
impl ArchiveTool for ProcessTool {
    async fn info(&self, archive: &Path) -> ToolResult<String> {
        self.run(ToolKind::Info, archive, Vec::new()).await
    }

    async fn dump(&self, archive: &Path) -> ToolResult<String> {
        self.run(ToolKind::Dump, archive, Vec::new()).await
    }

    async fn resize(&self, archive: &Path, request: &ResizeRequest) -> ToolResult<()> {
        let args = request.args().into_iter().map(OsString::from).collect();
        self.run(ToolKind::Resize, archive, args).await.map(|_| ())
    }

    async fn set_aggregation(&self, archive: &Path, method: AggregationMethod) -> ToolResult<()> {
        let args = vec![OsString::from(method.as_str())];
        self.run(ToolKind::SetAggregation, archive, args)
            .await
            .map(|_| ())
    }
}
