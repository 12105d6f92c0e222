//! Top-level error type for façade operations

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::index::IndexError;
use crate::selector::SelectorError;
use crate::tools::ToolError;

/// Errors that abort a whole command
///
/// Per-metric tool failures never show up here; they are recorded in the
/// batch report instead.
#[derive(Error, Debug)]
pub enum CtlError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Index task failed: {0}")]
    Task(String),
}

pub type CtlResult<T> = Result<T, CtlError>;
