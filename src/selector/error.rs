//! Selector error types

use thiserror::Error;

/// Errors that can occur while compiling a selector
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    /// Regular expression (or translated wildcard) failed to compile
    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidPattern { selector: String, reason: String },

    /// Empty selector string
    #[error("Selector must not be empty")]
    Empty,
}

/// Result type for selector operations
pub type SelectorResult<T> = Result<T, SelectorError>;
