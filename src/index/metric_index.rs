//! Metric Index - namespace tree built from a walk
//!
//! Each directory becomes a `NamespaceNode`; each archive file becomes a leaf
//! name on the node for its directory. Dotted metric names are assembled
//! once, at flatten time, by threading the parent prefix down the recursion,
//! so nodes never need a link back to their parent.
//!
//! ```text
//! stats/web/requests.wsp   →   "" ─ stats ─ web { requests }   →   stats.web.requests
//! ```
//!
//! The index is rebuilt from the filesystem for every operation and is never
//! patched in place.

use std::collections::BTreeSet;

use super::walker::{ArchiveTreeWalker, DirRecord, WalkStats, WalkerConfig};
use super::{IndexResult, IndexStats, MetricSet};

/// One path component of the metric namespace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceNode {
    /// Segment name (empty for the root)
    pub name: String,
    /// Leaf metric names directly in this directory, suffix stripped
    pub files: BTreeSet<String>,
    /// Child segments in walk order
    pub children: Vec<NamespaceNode>,
}

/// In-memory namespace tree over one storage root
#[derive(Debug, Clone)]
pub struct MetricIndex {
    root: NamespaceNode,
    stats: IndexStats,
}

impl MetricIndex {
    /// Walk the storage root and build the tree
    pub fn build(config: &WalkerConfig) -> IndexResult<Self> {
        let walk = ArchiveTreeWalker::new(config.clone()).walk()?;
        Ok(Self::from_record(&walk.root, &config.suffix, walk.stats))
    }

    /// Build from an already-walked directory record
    pub fn from_record(record: &DirRecord, suffix: &str, walk: WalkStats) -> Self {
        let mut stats = IndexStats {
            directories: walk.directories,
            unreadable: walk.unreadable,
            ..Default::default()
        };
        let root = build_node(record, suffix, &mut stats);

        tracing::debug!(
            metrics = stats.metrics,
            rejected = stats.rejected,
            "Metric index built"
        );

        Self { root, stats }
    }

    /// Empty index, as produced by an empty storage root
    pub fn empty() -> Self {
        Self {
            root: NamespaceNode::default(),
            stats: IndexStats {
                directories: 1,
                ..Default::default()
            },
        }
    }

    pub fn root(&self) -> &NamespaceNode {
        &self.root
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Every metric name, depth first, children before a node's own files
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.stats.metrics);
        flatten_into(&self.root, "", &mut out);
        out
    }

    /// Every metric name as a deduplicated, sorted set
    pub fn metric_set(&self) -> MetricSet {
        self.flatten().into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.stats.metrics
    }

    pub fn is_empty(&self) -> bool {
        self.stats.metrics == 0
    }
}

fn build_node(record: &DirRecord, suffix: &str, stats: &mut IndexStats) -> NamespaceNode {
    let mut files = BTreeSet::new();

    for file in &record.files {
        let Some(base) = file.strip_suffix(suffix) else {
            continue;
        };
        // A dot left after stripping would split into bogus segments
        if base.is_empty() || base.contains('.') {
            stats.rejected += 1;
            tracing::warn!(
                dir = ?record.rel_path,
                file = %file,
                "Skipping archive with a malformed name"
            );
            continue;
        }
        if files.insert(base.to_string()) {
            stats.metrics += 1;
        }
    }

    let children = record
        .subdirs
        .iter()
        .map(|sub| build_node(sub, suffix, stats))
        .collect();

    NamespaceNode {
        name: record.name.clone(),
        files,
        children,
    }
}

fn flatten_into(node: &NamespaceNode, prefix: &str, out: &mut Vec<String>) {
    for child in &node.children {
        let child_prefix = join(prefix, &child.name);
        flatten_into(child, &child_prefix, out);
    }
    for file in &node.files {
        out.push(join(prefix, file));
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}
