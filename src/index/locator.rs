//! Metric Locator - dotted names to archive paths
//!
//! `stats.web.requests` → `<storage>/stats/web/requests.wsp`. Inputs that
//! already name an existing file are passed through untouched.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use super::error::{IndexError, IndexResult};
use crate::archive::BACKUP_SUFFIX;

/// Maps metric names to archive files under one storage root
#[derive(Debug, Clone)]
pub struct MetricLocator {
    storage_dir: PathBuf,
    suffix: String,
}

impl MetricLocator {
    pub fn new(storage_dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            suffix: suffix.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Resolve a metric name or path to an archive path.
    ///
    /// Path-looking input that exists (as given, with the suffix appended,
    /// or either of those under the storage root) is returned as found.
    /// Anything else is converted syntactically; existence is not checked.
    pub fn locate(&self, metric: &str) -> PathBuf {
        if looks_like_path(metric) {
            if let Some(found) = self.existing_path(metric) {
                return found;
            }
        }
        self.path_for(metric)
    }

    /// Like [`locate`](Self::locate), but the archive must exist
    pub fn locate_existing(&self, metric: &str) -> IndexResult<PathBuf> {
        let path = self.locate(metric);
        if path.is_file() {
            Ok(path)
        } else {
            Err(IndexError::NotFound(metric.to_string()))
        }
    }

    /// Purely syntactic dotted-name conversion
    pub fn path_for(&self, metric: &str) -> PathBuf {
        let relative = format!("{}{}", metric.replace('.', &MAIN_SEPARATOR.to_string()), self.suffix);
        self.storage_dir.join(relative)
    }

    /// Backup artifact the resize tool leaves next to an archive
    pub fn backup_path(archive: &Path) -> PathBuf {
        let mut name = archive.as_os_str().to_os_string();
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    fn existing_path(&self, input: &str) -> Option<PathBuf> {
        let given = PathBuf::from(input);
        let mut candidates = vec![given.clone(), PathBuf::from(format!("{}{}", input, self.suffix))];
        if given.is_relative() {
            candidates.push(self.storage_dir.join(input));
            candidates.push(self.storage_dir.join(format!("{}{}", input, self.suffix)));
        }
        candidates.into_iter().find(|p| p.is_file())
    }
}

fn looks_like_path(input: &str) -> bool {
    input.contains('/') || input.contains(MAIN_SEPARATOR)
}
