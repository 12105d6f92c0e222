//! Mutations a batch can apply

use serde::Serialize;
use std::fmt;

use crate::archive::{AggregationMethod, XFilesFactor};
use crate::tools::ResizeRequest;

/// One change applied to every selected archive
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    /// Rewrite retentions (and optionally the fill factor)
    Resize(ResizeRequest),
    /// Switch the aggregation method
    SetAggregation { method: AggregationMethod },
    /// Change only the fill factor, keeping current retentions
    SetFillFactor { x_files_factor: XFilesFactor },
    /// Remove leftover `.bak` artifacts
    CleanBackups,
    /// Delete zero-length (corrupted) archives
    RemoveEmpty,
}

impl Mutation {
    pub fn resize(request: ResizeRequest) -> Self {
        Mutation::Resize(request)
    }

    pub fn set_aggregation(method: AggregationMethod) -> Self {
        Mutation::SetAggregation { method }
    }

    pub fn set_fill_factor(x_files_factor: XFilesFactor) -> Self {
        Mutation::SetFillFactor { x_files_factor }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Resize(request) => write!(f, "resize {}", request.args().join(" ")),
            Mutation::SetAggregation { method } => write!(f, "agg {}", method),
            Mutation::SetFillFactor { x_files_factor } => write!(f, "xff {}", x_files_factor),
            Mutation::CleanBackups => write!(f, "clean"),
            Mutation::RemoveEmpty => write!(f, "clean --empty"),
        }
    }
}
