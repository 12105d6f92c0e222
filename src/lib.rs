//! # whisperctl
//!
//! Batch maintenance for Whisper metric archives. Indexes an archive tree
//! into dotted metric names, resolves exact, wildcard or regex selectors
//! against that index, and applies resize / fill-factor / aggregation
//! changes to every match through the standard Whisper scripts.
//!
//! ## Modules
//!
//! - [`index`]: tree walker, namespace index, name → path mapping
//! - [`selector`]: selector parsing and resolution
//! - [`archive`]: retention, aggregation and fill-factor types; tool output parsers
//! - [`tools`]: the `ArchiveTool` capability and its subprocess implementation
//! - [`batch`]: bounded-concurrency mutation with per-metric outcomes
//! - [`ctl`]: one method per command, index built fresh each time
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use whisperctl::archive::AggregationMethod;
//! use whisperctl::{Config, SelectorSpec, WhisperCtl};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctl = WhisperCtl::from_config(&Config::load_default()?);
//!
//!     // Every per-host request counter
//!     let spec = SelectorSpec::single("servers.*.requests");
//!     let report = ctl.agg(&spec, AggregationMethod::Sum).await?;
//!
//!     println!("{}", report);
//!     for failure in report.failures() {
//!         eprintln!("{}: {}", failure.metric, failure.message.as_deref().unwrap_or(""));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod batch;
pub mod config;
pub mod ctl;
pub mod error;
pub mod index;
pub mod selector;
pub mod tools;

// Re-export top-level types for convenience
pub use archive::{AggregationMethod, ArchiveError, ArchiveInfo, DumpSummary, RetentionStanza, XFilesFactor};

pub use index::{IndexError, IndexStats, MetricIndex, MetricLocator, MetricSet, WalkerConfig};

pub use selector::{resolve, resolve_all, Selector, SelectorError, SelectorSpec};

pub use tools::{ArchiveTool, ProcessTool, ResizeRequest, ToolError, ToolKind};

pub use batch::{BatchMutator, BatchOptions, BatchReport, Mutation, MutationOutcome, OutcomeStatus};

pub use config::{generate_default_config, Config, ConfigError, LoggingConfig};

pub use ctl::WhisperCtl;

pub use error::{CtlError, CtlResult};
