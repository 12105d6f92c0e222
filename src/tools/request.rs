//! Resize invocation arguments

use serde::Serialize;

use crate::archive::{ArchiveError, ArchiveInfo, ArchiveResult, RetentionStanza, XFilesFactor};

/// Everything the resize tool needs besides the archive path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeRequest {
    /// New retention tiers, most granular first
    pub retentions: Vec<RetentionStanza>,
    /// Optional new fill factor
    pub x_files_factor: Option<XFilesFactor>,
}

impl ResizeRequest {
    pub fn new(retentions: Vec<RetentionStanza>) -> ArchiveResult<Self> {
        if retentions.is_empty() {
            return Err(ArchiveError::NoRetentions);
        }
        Ok(Self {
            retentions,
            x_files_factor: None,
        })
    }

    /// Parse retention definitions such as `60:1440` or `1h:7d`
    pub fn parse<S: AsRef<str>>(defs: &[S]) -> ArchiveResult<Self> {
        let retentions = defs
            .iter()
            .map(|d| d.as_ref().parse())
            .collect::<ArchiveResult<Vec<RetentionStanza>>>()?;
        Self::new(retentions)
    }

    /// Re-issue an archive's current retentions with a new fill factor.
    ///
    /// The resize tool wants the full retention list on every call, so a
    /// fill-factor change copies it verbatim from the info output.
    /// Output with any unparseable `Archive` stanza is rejected, since
    /// resizing with a subset of tiers would drop the rest.
    pub fn preserving(info: &ArchiveInfo, x_files_factor: XFilesFactor) -> ArchiveResult<Self> {
        if !info.is_complete() {
            return Err(ArchiveError::PartialRetentionInfo(info.skipped_archives));
        }
        Ok(Self::new(info.retentions().to_vec())?.with_x_files_factor(x_files_factor))
    }

    pub fn with_x_files_factor(mut self, x_files_factor: XFilesFactor) -> Self {
        self.x_files_factor = Some(x_files_factor);
        self
    }

    pub fn retention_args(&self) -> Vec<String> {
        self.retentions.iter().map(RetentionStanza::to_arg).collect()
    }

    /// Arguments that follow the archive path: optional flag, then retentions
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.retentions.len() + 1);
        if let Some(xff) = self.x_files_factor {
            args.push(xff.to_flag());
        }
        args.extend(self.retention_args());
        args
    }
}
