//! Archive argument error types

use thiserror::Error;

/// Errors raised while validating archive-level arguments
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArchiveError {
    /// Retention definition could not be parsed
    #[error("Invalid retention definition: {0:?} (expected seconds:points, e.g. 60:1440 or 1m:1d)")]
    InvalidRetention(String),

    /// Aggregation method name not recognized
    #[error("Unknown aggregation method: {0:?}")]
    UnknownAggregation(String),

    /// Fill factor outside [0, 1]
    #[error("xFilesFactor must be within [0, 1], got {0}")]
    InvalidFillFactor(f64),

    /// Fill factor is not a number
    #[error("xFilesFactor is not a number: {0:?}")]
    InvalidFillFactorText(String),

    /// Info output had `Archive` stanzas that could not be parsed
    #[error("Partial retention info: {0} archive stanza(s) could not be parsed")]
    PartialRetentionInfo(usize),

    /// A resize was requested with no retention tiers
    #[error("At least one retention definition is required")]
    NoRetentions,
}

/// Result type alias for archive argument handling
pub type ArchiveResult<T> = Result<T, ArchiveError>;
