//! CLI entry point for maxcap.
//!
//! Aggregates per-device radio performance exports into hourly (or coarser)
//! bins with tonnage figures, optionally reduced to the busiest bin per
//! device and calendar period.

use anyhow::Result;
use clap::Parser;
use maxcap::analyzers::analyzer::{RunOutcome, run};
use maxcap::config::{BusiestPeriod, BusiestValidity, Frequency, RunConfig};
use maxcap::diagnostics::TracingSink;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const USAGE: &str = "\
Usage Information:

maxcap processes exported traffic performance metrics from CSV files named
<device-serial>-<anything>.csv (default pattern s*-*.csv).

Mandatory fields (columns):
- Time (date and time of the sample)
- RF Utilization (radio frequency utilization)
- DL Capacity (downlink capacity)

Optional fields:
- UL Capacity, DL Rate, UL Rate
- Active Connections (max per bin)
- DL Peak Rate, UL Peak Rate (max per bin)
- Bandwidth, Carrier 0-3 (max per bin)

Options:
- -d, --input-dir <dir>     directory holding the exports (default .)
- -p, --pattern <glob>      filename pattern (default s*-*.csv)
- -o, --outfile <file>      output CSV; console when omitted
- -f, --frequency [freq]    h (default), d, w, m or y
- -b, --busiest [period]    busiest bin by DL Tonnage GB per d (default), w, m or y
- -c, --config <file>       JSON config file; flags override it
- -j, --concurrency <n>     files processed at once (default 1)
- --keep-zero-counts        report a measured 0 count as 0 instead of missing
- --per-group-validity      drop only invalid busiest groups instead of all output

Examples:
  maxcap
  maxcap -o results.csv
  maxcap -f d -b d
  maxcap -f w -o output_weekly.csv
";

#[derive(Parser)]
#[command(name = "maxcap")]
#[command(about = "Aggregate per-device radio performance exports", long_about = None)]
struct Cli {
    /// Directory containing device CSV exports
    #[arg(short = 'd', long, env = "MAXCAP_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Filename pattern of device exports
    #[arg(short, long)]
    pattern: Option<String>,

    /// Output CSV file (stdout when omitted)
    #[arg(short, long, env = "MAXCAP_OUTFILE")]
    outfile: Option<PathBuf>,

    /// Resampling frequency: h, d, w, m or y
    #[arg(short, long, num_args = 0..=1, default_missing_value = "h")]
    frequency: Option<Frequency>,

    /// Output the busiest bin per device for a period: d, w, m or y
    #[arg(short, long, num_args = 0..=1, default_missing_value = "day")]
    busiest: Option<BusiestPeriod>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of files processed at once
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Keep measured zero counts instead of reporting them as missing
    #[arg(long)]
    keep_zero_counts: bool,

    /// Drop only invalid busiest groups instead of suppressing all busiest output
    #[arg(long)]
    per_group_validity: bool,

    /// Display usage information and exit
    #[arg(short, long)]
    usage: bool,
}

impl Cli {
    /// Layers command-line values over the config file (or defaults).
    fn into_config(self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        if let Some(dir) = self.input_dir {
            config.input_dir = dir;
        }
        if let Some(pattern) = self.pattern {
            config.pattern = pattern;
        }
        if let Some(outfile) = self.outfile {
            config.output = Some(outfile);
        }
        if let Some(frequency) = self.frequency {
            config.frequency = frequency;
        }
        if let Some(busiest) = self.busiest {
            config.busiest = Some(busiest);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.keep_zero_counts {
            config.zero_counts_as_missing = false;
        }
        if self.per_group_validity {
            config.busiest_validity = BusiestValidity::PerGroup;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.usage {
        println!("{USAGE}");
        return Ok(());
    }

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/maxcap.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("maxcap.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let config = cli.into_config()?;
    let summary = run(&config, &TracingSink).await?;

    info!(
        files_found = summary.files_found,
        files_used = summary.files_used,
        files_skipped = summary.files_skipped,
        outcome = ?summary.outcome,
        "Run finished"
    );

    if summary.outcome == RunOutcome::NoResults {
        eprintln!("No valid input files; no output written.");
    }

    Ok(())
}
