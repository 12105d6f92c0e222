//! whisperctl CLI
//!
//! Command-line interface for Whisper archive maintenance:
//! - List and search indexed metrics
//! - Inspect archives (info, dump)
//! - Batch resize / fill-factor / aggregation changes
//! - Clean leftover resize backups and zero-byte archives

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use whisperctl::archive::{AggregationMethod, ArchiveInfo, DumpSummary, XFilesFactor};
use whisperctl::batch::{BatchReport, Inspection};
use whisperctl::{generate_default_config, Config, LoggingConfig, ResizeRequest, SelectorSpec, WhisperCtl};

#[derive(Parser)]
#[command(name = "whisperctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch maintenance for Whisper metric archives")]
#[command(long_about = "whisperctl indexes a Whisper archive tree into dotted metric names,\nresolves selectors against it, and resizes or re-aggregates every match.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Graphite installation root
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Archive tree directory, relative to the root unless absolute
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Maximum tool processes running at once
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Per-invocation tool timeout in seconds (0 = none)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// Selectors shared by the read-only commands
#[derive(Args)]
pub struct SelectorArgs {
    /// Treat selectors as regular expressions
    #[arg(short = 'e', long = "regex")]
    pub regex: bool,

    /// Metric names or wildcard patterns
    #[arg(required = true)]
    pub selectors: Vec<String>,
}

impl SelectorArgs {
    fn spec(self) -> SelectorSpec {
        SelectorSpec::new(self.selectors, self.regex)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every indexed metric
    Index {
        /// Write the listing to a file, one metric per line
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print metrics matching the selectors
    Search(SelectorArgs),

    /// Show header and retentions of matching archives
    Info(SelectorArgs),

    /// Summarize stored points of matching archives
    Dump(SelectorArgs),

    /// Rewrite retentions of matching archives
    Resize {
        #[arg(short = 'e', long = "regex")]
        regex: bool,
        /// Also set the xFilesFactor
        #[arg(long)]
        xff: Option<String>,
        /// Report what would change without running tools
        #[arg(long)]
        dry_run: bool,
        /// Metric name or pattern
        selector: String,
        /// Retentions such as 60:1440 or 1m:1d
        #[arg(required = true)]
        retentions: Vec<String>,
    },

    /// Set the xFilesFactor of matching archives
    Xff {
        #[arg(short = 'e', long = "regex")]
        regex: bool,
        #[arg(long)]
        dry_run: bool,
        selector: String,
        /// Fill factor in [0, 1]
        value: String,
    },

    /// Set the aggregation method of matching archives
    Agg {
        #[arg(short = 'e', long = "regex")]
        regex: bool,
        #[arg(long)]
        dry_run: bool,
        selector: String,
        /// average, sum, last, max, min, avg_zero, absmax, absmin
        method: String,
    },

    /// Remove leftover .bak files (or, with --empty, zero-byte archives)
    Clean {
        /// Delete zero-length (corrupted) archives instead of backups
        #[arg(long)]
        empty: bool,
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        selectors: SelectorArgs,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    if let Commands::Config { output } = &cli.command {
        write_default_config(output.as_ref())?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    init_logging(&config.logging)?;

    tracing::debug!("whisperctl v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Storage directory: {:?}", config.storage.storage_dir());

    let ctl = WhisperCtl::from_config(&config);
    let format = cli.format;

    match cli.command {
        Commands::Index { output } => {
            let index = ctl.index().await.context("cannot index storage directory")?;
            let metrics: Vec<String> = index.metric_set().into_iter().collect();

            match output {
                Some(path) => {
                    let mut listing = String::with_capacity(metrics.len() * 32);
                    for metric in &metrics {
                        listing.push_str(metric);
                        listing.push('\n');
                    }
                    std::fs::write(&path, listing)
                        .with_context(|| format!("cannot write {:?}", path))?;
                    println!("Wrote {} metrics to {:?}", metrics.len(), path);
                }
                None => print_metrics(&metrics, format)?,
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Search(args) => {
            let metrics = ctl.search(&args.spec()).await?;
            let metrics: Vec<String> = metrics.into_iter().collect();
            print_metrics(&metrics, format)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Info(args) => {
            let infos = ctl.info(&args.spec()).await?;
            print_info(&infos, format)?;
            Ok(exit_for(infos.iter().any(Inspection::is_failed)))
        }

        Commands::Dump(args) => {
            let dumps = ctl.dump(&args.spec()).await?;
            print_dump(&dumps, format)?;
            Ok(exit_for(dumps.iter().any(Inspection::is_failed)))
        }

        Commands::Resize {
            regex,
            xff,
            dry_run,
            selector,
            retentions,
        } => {
            let mut request = ResizeRequest::parse(&retentions)?;
            if let Some(xff) = xff {
                request = request.with_x_files_factor(xff.parse::<XFilesFactor>()?);
            }
            let spec = SelectorSpec::new(vec![selector], regex);
            let report = ctl.with_dry_run(dry_run).resize(&spec, request).await?;
            finish_report(&report, format)
        }

        Commands::Xff {
            regex,
            dry_run,
            selector,
            value,
        } => {
            let xff: XFilesFactor = value.parse()?;
            let spec = SelectorSpec::new(vec![selector], regex);
            let report = ctl.with_dry_run(dry_run).xff(&spec, xff).await?;
            finish_report(&report, format)
        }

        Commands::Agg {
            regex,
            dry_run,
            selector,
            method,
        } => {
            let method: AggregationMethod = method.parse()?;
            let spec = SelectorSpec::new(vec![selector], regex);
            let report = ctl.with_dry_run(dry_run).agg(&spec, method).await?;
            finish_report(&report, format)
        }

        Commands::Clean {
            empty,
            dry_run,
            selectors,
        } => {
            let ctl = ctl.with_dry_run(dry_run);
            let spec = selectors.spec();
            let report = if empty {
                ctl.remove_empty(&spec).await?
            } else {
                ctl.clean(&spec).await?
            };
            finish_report(&report, format)
        }

        Commands::Config { .. } => Ok(ExitCode::SUCCESS),
    }
}

/// Config file (explicit or default search), then env, then CLI flags
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default()?,
    };

    if let Some(root) = &cli.root {
        config.storage.root = root.clone();
    }
    if let Some(storage) = &cli.storage {
        config.storage.whisper_dir = storage.clone();
    }
    if let Some(jobs) = cli.jobs {
        config.batch.concurrency = jobs;
    }
    if let Some(timeout) = cli.timeout {
        config.tools.timeout_secs = timeout;
    }

    Ok(config)
}

/// RUST_LOG wins over the configured level. Logs never go to stdout.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("whisperctl={}", logging.level)));

    let writer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {:?}", path))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let ansi = logging.file.is_none();

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(ansi).with_writer(writer))
            .init();
    }

    Ok(())
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }
    Ok(())
}

fn exit_for(failed: bool) -> ExitCode {
    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn finish_report(report: &BatchReport, format: OutputFormat) -> anyhow::Result<ExitCode> {
    print_report(report, format)?;
    Ok(exit_for(report.has_failures()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn csv_writer() -> csv::Writer<std::io::Stdout> {
    csv::Writer::from_writer(std::io::stdout())
}

fn print_metrics(metrics: &[String], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(metrics),
        OutputFormat::Csv => {
            let mut wtr = csv_writer();
            wtr.write_record(["metric"])?;
            for metric in metrics {
                wtr.write_record([metric])?;
            }
            wtr.flush()?;
            Ok(())
        }
        OutputFormat::Table => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for metric in metrics {
                writeln!(out, "{}", metric)?;
            }
            writeln!(out)?;
            writeln!(out, "{} metrics", metrics.len())?;
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct ReportRow<'a> {
    metric: &'a str,
    status: String,
    path: String,
    message: &'a str,
}

fn print_report(report: &BatchReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Csv => {
            let mut wtr = csv_writer();
            for outcome in &report.outcomes {
                wtr.serialize(ReportRow {
                    metric: &outcome.metric,
                    status: outcome.status.to_string(),
                    path: outcome
                        .path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    message: outcome.message.as_deref().unwrap_or(""),
                })?;
            }
            wtr.flush()?;
            Ok(())
        }
        OutputFormat::Table => {
            if report.is_empty() {
                println!("No metrics matched");
                return Ok(());
            }

            println!("{:<48} {:<8} {}", "Metric", "Status", "Message");
            println!("{}", "-".repeat(80));
            for outcome in &report.outcomes {
                println!(
                    "{:<48} {:<8} {}",
                    outcome.metric,
                    outcome.status,
                    outcome.message.as_deref().unwrap_or("")
                );
            }
            println!();
            println!("{}", report);
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct InfoRow<'a> {
    metric: &'a str,
    status: String,
    aggregation: String,
    x_files_factor: String,
    max_retention: String,
    file_size: String,
    retentions: String,
    message: &'a str,
}

fn print_info(infos: &[Inspection<ArchiveInfo>], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(infos),
        OutputFormat::Csv => {
            let mut wtr = csv_writer();
            for inspection in infos {
                let info = inspection.data.as_ref();
                wtr.serialize(InfoRow {
                    metric: &inspection.metric,
                    status: inspection.status.to_string(),
                    aggregation: info
                        .and_then(|i| i.aggregation_method())
                        .map(|m| m.to_string())
                        .unwrap_or_default(),
                    x_files_factor: info
                        .and_then(|i| i.x_files_factor())
                        .map(|x| x.to_string())
                        .unwrap_or_default(),
                    max_retention: info
                        .and_then(|i| i.max_retention())
                        .map(|r| r.to_string())
                        .unwrap_or_default(),
                    file_size: info
                        .and_then(|i| i.file_size())
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                    retentions: info.map(|i| i.retention_args().join(" ")).unwrap_or_default(),
                    message: inspection.message.as_deref().unwrap_or(""),
                })?;
            }
            wtr.flush()?;
            Ok(())
        }
        OutputFormat::Table => {
            if infos.is_empty() {
                println!("No metrics matched");
                return Ok(());
            }

            for inspection in infos {
                println!("{} ({:?})", inspection.metric, inspection.path);
                match &inspection.data {
                    Some(info) => {
                        for (key, value) in &info.header {
                            println!("  {:<20} {}", key, value);
                        }
                        for (i, retention) in info.retentions().iter().enumerate() {
                            println!(
                                "  archive {:<12} {} ({}s)",
                                i,
                                retention,
                                retention.retention_secs()
                            );
                        }
                    }
                    None => println!(
                        "  {}: {}",
                        inspection.status,
                        inspection.message.as_deref().unwrap_or("")
                    ),
                }
                println!();
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct DumpRow<'a> {
    metric: &'a str,
    status: String,
    points: usize,
    first: String,
    last: String,
    message: &'a str,
}

fn print_dump(dumps: &[Inspection<DumpSummary>], format: OutputFormat) -> anyhow::Result<()> {
    let range = |summary: &DumpSummary| {
        summary
            .range_utc()
            .map(|(first, last)| {
                (
                    first.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                    last.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                )
            })
            .unwrap_or_default()
    };

    match format {
        OutputFormat::Json => print_json(dumps),
        OutputFormat::Csv => {
            let mut wtr = csv_writer();
            for inspection in dumps {
                let (first, last) = inspection.data.as_ref().map(range).unwrap_or_default();
                wtr.serialize(DumpRow {
                    metric: &inspection.metric,
                    status: inspection.status.to_string(),
                    points: inspection.data.as_ref().map_or(0, DumpSummary::non_null_count),
                    first,
                    last,
                    message: inspection.message.as_deref().unwrap_or(""),
                })?;
            }
            wtr.flush()?;
            Ok(())
        }
        OutputFormat::Table => {
            if dumps.is_empty() {
                println!("No metrics matched");
                return Ok(());
            }

            println!("{:<48} {:>8}  {:<20}  {:<20}", "Metric", "Points", "First", "Last");
            println!("{}", "-".repeat(102));
            for inspection in dumps {
                match &inspection.data {
                    Some(summary) => {
                        let (first, last) = range(summary);
                        println!(
                            "{:<48} {:>8}  {:<20}  {:<20}",
                            inspection.metric,
                            summary.non_null_count(),
                            first,
                            last
                        );
                        for (archive, count) in &summary.per_archive {
                            println!("  archive {:<38} {:>8}", archive, count);
                        }
                    }
                    None => println!(
                        "{:<48} {}: {}",
                        inspection.metric,
                        inspection.status,
                        inspection.message.as_deref().unwrap_or("")
                    ),
                }
            }
            Ok(())
        }
    }
}
