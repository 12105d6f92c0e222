//! Archive Tree Walker
//!
//! One depth-first pass over the storage root. Each directory becomes a
//! `DirRecord` holding its archive files and its subdirectory records, so the
//! index can be built without touching the filesystem again.
//!
//! An unreadable subdirectory is logged and left empty; its siblings are
//! still walked. Only an unreadable root fails the walk.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::error::{IndexError, IndexResult};
use crate::archive::ARCHIVE_SUFFIX;

/// Walker settings
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Directory holding the archive tree
    pub root: PathBuf,
    /// Only files ending in this suffix are kept
    pub suffix: String,
    /// Descend into symlinked directories
    pub follow_symlinks: bool,
}

impl WalkerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            suffix: ARCHIVE_SUFFIX.to_string(),
            follow_symlinks: false,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

/// One visited directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirRecord {
    /// Path relative to the walk root (empty for the root itself)
    pub rel_path: PathBuf,
    /// Directory name (empty for the root)
    pub name: String,
    /// Archive file names directly inside, suffix included, sorted
    pub files: Vec<String>,
    /// Child directories in walk order
    pub subdirs: Vec<DirRecord>,
}

impl DirRecord {
    fn new(rel_path: PathBuf, name: String) -> Self {
        Self {
            rel_path,
            name,
            ..Default::default()
        }
    }
}

/// Counters from a single walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub directories: usize,
    pub archives: usize,
    /// Files skipped for not carrying the archive suffix
    pub ignored_files: usize,
    /// Subdirectories (or entries) that could not be read
    pub unreadable: usize,
}

/// Result of a walk
#[derive(Debug, Clone)]
pub struct WalkOutput {
    pub root: DirRecord,
    pub stats: WalkStats,
}

/// Recursive descent over an archive tree
#[derive(Debug, Clone)]
pub struct ArchiveTreeWalker {
    config: WalkerConfig,
}

impl ArchiveTreeWalker {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WalkerConfig {
        &self.config
    }

    /// Walk the tree rooted at `config.root`
    pub fn walk(&self) -> IndexResult<WalkOutput> {
        let root = self.config.root.as_path();

        // Fail fast on the root; everything below it is best effort
        std::fs::read_dir(root).map_err(|source| IndexError::Filesystem {
            path: root.to_path_buf(),
            source,
        })?;

        let mut stats = WalkStats::default();
        let mut stack: Vec<DirRecord> = Vec::new();

        let entries = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    stats.unreadable += 1;
                    tracing::warn!(
                        path = ?err.path().unwrap_or(root),
                        "Skipping unreadable entry: {}",
                        err
                    );
                    continue;
                }
            };

            let depth = entry.depth();
            close_until(&mut stack, depth.max(1));

            let name = entry.file_name().to_string_lossy().to_string();

            if entry.file_type().is_dir() {
                if depth > 0 && stack.len() != depth {
                    // Parent was never opened (unreadable); drop the orphan
                    continue;
                }
                stats.directories += 1;
                let rel_path = relative(root, entry.path());
                tracing::debug!(path = ?rel_path, "Visiting directory");
                stack.push(DirRecord::new(
                    rel_path,
                    if depth == 0 { String::new() } else { name },
                ));
            } else if let Some(parent) = stack.last_mut() {
                if name.ends_with(&self.config.suffix) {
                    stats.archives += 1;
                    parent.files.push(name);
                } else {
                    stats.ignored_files += 1;
                }
            }
        }

        close_until(&mut stack, 1);
        let root_record = stack.pop().unwrap_or_default();

        tracing::debug!(
            directories = stats.directories,
            archives = stats.archives,
            ignored = stats.ignored_files,
            unreadable = stats.unreadable,
            "Walk complete"
        );

        Ok(WalkOutput {
            root: root_record,
            stats,
        })
    }
}

/// Pop finished directories until `len` remain, attaching each to its parent
fn close_until(stack: &mut Vec<DirRecord>, len: usize) {
    while stack.len() > len {
        if let Some(done) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.subdirs.push(done);
            }
        }
    }
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
