//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::BatchOptions;
use crate::index::{MetricLocator, WalkerConfig};
use crate::tools::{ProcessTool, ToolKind, ToolPaths};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the archive tree lives
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Installation root
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Archive tree, relative to `root` unless absolute
    #[serde(default = "default_whisper_dir")]
    pub whisper_dir: PathBuf,

    #[serde(default = "default_suffix")]
    pub suffix: String,

    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from("/opt/graphite")
}

fn default_whisper_dir() -> PathBuf {
    PathBuf::from("storage/whisper")
}

fn default_suffix() -> String {
    crate::archive::ARCHIVE_SUFFIX.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            whisper_dir: default_whisper_dir(),
            suffix: default_suffix(),
            follow_symlinks: false,
        }
    }
}

impl StorageConfig {
    /// Absolute archive tree directory
    pub fn storage_dir(&self) -> PathBuf {
        self.root.join(&self.whisper_dir)
    }

    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.storage_dir())
            .with_suffix(self.suffix.clone())
            .with_follow_symlinks(self.follow_symlinks)
    }

    pub fn locator(&self) -> MetricLocator {
        MetricLocator::new(self.storage_dir(), self.suffix.clone())
    }
}

/// External Whisper scripts
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Script directory, relative to `storage.root` unless absolute
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,

    #[serde(default = "default_info")]
    pub info: String,

    #[serde(default = "default_dump")]
    pub dump: String,

    #[serde(default = "default_resize")]
    pub resize: String,

    #[serde(default = "default_set_aggregation")]
    pub set_aggregation: String,

    /// Per-invocation limit; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("bin")
}

fn default_info() -> String {
    "whisper-info.py".to_string()
}

fn default_dump() -> String {
    "whisper-dump.py".to_string()
}

fn default_resize() -> String {
    "whisper-resize.py".to_string()
}

fn default_set_aggregation() -> String {
    "whisper-set-aggregation-method.py".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            bin_dir: default_bin_dir(),
            info: default_info(),
            dump: default_dump(),
            resize: default_resize(),
            set_aggregation: default_set_aggregation(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    /// Script path for `kind`, with `bin_dir` resolved against `root`
    pub fn path_for(&self, root: &Path, kind: ToolKind) -> PathBuf {
        let name = match kind {
            ToolKind::Info => &self.info,
            ToolKind::Dump => &self.dump,
            ToolKind::Resize => &self.resize,
            ToolKind::SetAggregation => &self.set_aggregation,
        };
        root.join(&self.bin_dir).join(name)
    }

    pub fn tool_paths(&self, root: &Path) -> ToolPaths {
        ToolPaths {
            info: self.path_for(root, ToolKind::Info),
            dump: self.path_for(root, ToolKind::Dump),
            resize: self.path_for(root, ToolKind::Resize),
            set_aggregation: self.path_for(root, ToolKind::SetAggregation),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Batch execution defaults
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl BatchConfig {
    pub fn options(&self) -> BatchOptions {
        BatchOptions::default().with_concurrency(self.concurrency.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment.
    ///
    /// The first existing file wins. A file that exists but cannot be read
    /// or parsed is an error, never a silent fallback to built-in paths.
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("whisperctl").join("config.toml")),
            Some(PathBuf::from("/etc/whisperctl/config.toml")),
            Some(PathBuf::from("./whisperctl.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    fn load_first(config_paths: &[PathBuf]) -> Result<Self, ConfigError> {
        match config_paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = Self::load_with_env(path)?;
                tracing::debug!("Loaded config from {:?}", path);
                Ok(config)
            }
            None => {
                tracing::debug!("Using default config with environment overrides");
                Ok(Self::from_env())
            }
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Storage overrides
        if let Some(root) = lookup("WHISPERCTL_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(dir) = lookup("WHISPERCTL_WHISPER_DIR") {
            self.storage.whisper_dir = PathBuf::from(dir);
        }
        if let Some(suffix) = lookup("WHISPERCTL_SUFFIX") {
            self.storage.suffix = suffix;
        }

        // Tool overrides
        if let Some(bin_dir) = lookup("WHISPERCTL_BIN_DIR") {
            self.tools.bin_dir = PathBuf::from(bin_dir);
        }
        if let Some(timeout) = lookup("WHISPERCTL_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.tools.timeout_secs = t;
            }
        }

        // Batch overrides
        if let Some(concurrency) = lookup("WHISPERCTL_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.batch.concurrency = c;
            }
        }

        // Logging overrides
        if let Some(level) = lookup("WHISPERCTL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("WHISPERCTL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Subprocess tool built from `[tools]`, rooted at `storage.root`
    pub fn process_tool(&self) -> ProcessTool {
        ProcessTool::new(self.tools.tool_paths(&self.storage.root)).with_timeout(self.tools.timeout())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# whisperctl Configuration
#
# Environment variables override these settings:
# - WHISPERCTL_ROOT
# - WHISPERCTL_WHISPER_DIR
# - WHISPERCTL_SUFFIX
# - WHISPERCTL_BIN_DIR
# - WHISPERCTL_TIMEOUT_SECS
# - WHISPERCTL_CONCURRENCY
# - WHISPERCTL_LOG_LEVEL
# - WHISPERCTL_LOG_FORMAT

[storage]
# Graphite installation root
root = "/opt/graphite"

# Archive tree, relative to root unless absolute
whisper_dir = "storage/whisper"

# Archive file suffix
suffix = ".wsp"

# Descend into symlinked directories
follow_symlinks = false

[tools]
# Whisper script directory, relative to root unless absolute
bin_dir = "bin"

info = "whisper-info.py"
dump = "whisper-dump.py"
resize = "whisper-resize.py"
set_aggregation = "whisper-set-aggregation-method.py"

# Kill a tool invocation after this many seconds (0 = never)
timeout_secs = 300

[batch]
# Maximum tool processes running at once
concurrency = 4

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty or json
format = "pretty"

# Optional log file path (stdout stays reserved for results)
# file = "/var/log/whisperctl.log"
"#
    .to_string()
}
