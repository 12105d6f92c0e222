//! External archive tools
//!
//! Archives are only ever read or rewritten by the Whisper scripts. This
//! module puts a narrow capability trait in front of them:
//!
//! - **ArchiveTool**: info / dump / resize / set-aggregation
//! - **ProcessTool**: the real thing, one subprocess per call, with timeout
//! - **ResizeRequest**: arguments for a resize call
//!
//! Batch code only sees `dyn ArchiveTool`, so tests swap in a fake that
//! records calls and replays scripted results.

mod error;
#[cfg(test)]
pub mod mock;
mod process;
mod request;

pub use error::{ToolError, ToolResult};
pub use process::{ProcessTool, ToolPaths};
pub use request::ResizeRequest;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::archive::AggregationMethod;

/// Which external tool an invocation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Info,
    Dump,
    Resize,
    SetAggregation,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Info => write!(f, "info"),
            ToolKind::Dump => write!(f, "dump"),
            ToolKind::Resize => write!(f, "resize"),
            ToolKind::SetAggregation => write!(f, "set-aggregation"),
        }
    }
}

/// Capability interface over the archive tools
#[async_trait]
pub trait ArchiveTool: Send + Sync {
    /// Run the info tool; returns its stdout
    async fn info(&self, archive: &Path) -> ToolResult<String>;

    /// Run the dump tool; returns its stdout
    async fn dump(&self, archive: &Path) -> ToolResult<String>;

    /// Rewrite an archive with new retentions (and optionally fill factor)
    async fn resize(&self, archive: &Path, request: &ResizeRequest) -> ToolResult<()>;

    /// Change an archive's aggregation method
    async fn set_aggregation(&self, archive: &Path, method: AggregationMethod) -> ToolResult<()>;
}
