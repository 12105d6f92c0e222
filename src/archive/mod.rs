//! Whisper archive value types
//!
//! whisperctl never reads archive files itself. Everything it knows about an
//! archive comes from the external tools, so this module holds the types
//! those conversations are expressed in:
//!
//! - **types**: `RetentionStanza`, `AggregationMethod`, `XFilesFactor`
//! - **info**: parser for info tool output (`ArchiveInfo`)
//! - **dump**: parser for dump tool output (`DumpSummary`)
//! - **error**: argument validation errors

pub mod dump;
pub mod error;
pub mod info;
pub mod types;

pub use dump::{DumpPoint, DumpSummary};
pub use error::{ArchiveError, ArchiveResult};
pub use info::ArchiveInfo;
pub use types::{AggregationMethod, RetentionStanza, XFilesFactor};

/// Default archive file suffix
pub const ARCHIVE_SUFFIX: &str = ".wsp";

/// Suffix the resize tool appends to its backup copy
pub const BACKUP_SUFFIX: &str = ".bak";
