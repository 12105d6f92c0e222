//! External tool error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::ToolKind;

/// Errors from invoking an external archive tool
#[derive(Error, Debug)]
pub enum ToolError {
    /// Process could not be started
    #[error("Failed to launch {tool} tool {program:?}: {source}")]
    Launch {
        tool: ToolKind,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while waiting for the process
    #[error("I/O error while running {tool} tool: {source}")]
    Io {
        tool: ToolKind,
        #[source]
        source: std::io::Error,
    },

    /// Process ran but reported failure
    #[error("{tool} tool exited with {}: {}", exit_label(.code), .message.trim())]
    ExitStatus {
        tool: ToolKind,
        code: Option<i32>,
        /// stderr as captured (stdout if stderr was empty)
        message: String,
    },

    /// Process exceeded the configured timeout and was killed
    #[error("{tool} tool timed out after {}s", .after.as_secs_f64())]
    Timeout { tool: ToolKind, after: Duration },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl ToolError {
    pub fn tool(&self) -> ToolKind {
        match self {
            ToolError::Launch { tool, .. }
            | ToolError::Io { tool, .. }
            | ToolError::ExitStatus { tool, .. }
            | ToolError::Timeout { tool, .. } => *tool,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolError::Timeout { .. })
    }
}

/// Result type alias for tool invocations
pub type ToolResult<T> = Result<T, ToolError>;
