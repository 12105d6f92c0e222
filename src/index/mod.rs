//! whisperctl Index Structures
//!
//! Turns a directory tree of archives into a queryable set of metric names:
//!
//! - **ArchiveTreeWalker**: single recursive pass over the storage root
//! - **MetricIndex**: namespace tree of segments, flattened to dotted names
//! - **MetricLocator**: dotted name → archive path, and back
//!
//! # Architecture
//!
//! ```text
//! storage/whisper/stats/web/requests.wsp
//!        ↓
//! ArchiveTreeWalker: DirRecord { stats { web { requests.wsp } } }
//!        ↓
//! MetricIndex: "" ─ stats ─ web { requests }
//!        ↓
//! flatten → {"stats.web.requests", ...}
//! ```

mod error;
mod locator;
mod metric_index;
mod walker;

pub use error::{IndexError, IndexResult};
pub use locator::MetricLocator;
pub use metric_index::{MetricIndex, NamespaceNode};
pub use walker::{ArchiveTreeWalker, DirRecord, WalkOutput, WalkStats, WalkerConfig};

use std::collections::BTreeSet;

/// Unique metric names, kept sorted so every listing is deterministic
pub type MetricSet = BTreeSet<String>;

/// Statistics about one index build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Directories visited
    pub directories: usize,
    /// Metric names indexed
    pub metrics: usize,
    /// Archive files skipped for malformed names
    pub rejected: usize,
    /// Entries the walker could not read
    pub unreadable: usize,
}
