//! Command-line interface for batchconv
//!
//! A single command: convert every pending file under INPUT into the
//! mirrored tree under OUTPUT. Flags given on the command line override the
//! layered configuration (see [`crate::config`]).

use anyhow::Result;
use clap::Parser;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::process::ExitCode;

mod convert;
mod output;

pub use output::Output;

use crate::parallel::DistributionStrategy;
use crate::report::SummaryFormat;

/// batchconv - convert a directory tree of files in parallel
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root directory to read input files from
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Root directory of the mirrored output tree
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Extension of input files to convert (e.g. json)
    #[arg(short, long, value_name = "EXT")]
    pub from: Option<String>,

    /// Extension of output files (e.g. yaml)
    #[arg(short, long, value_name = "EXT")]
    pub to: Option<String>,

    /// How work is distributed across workers
    #[arg(short, long, value_enum)]
    pub strategy: Option<DistributionStrategy>,

    /// Number of workers (0 = one per available core)
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Match the input extension ignoring case
    #[arg(long)]
    pub ignore_case: bool,

    /// Glob pattern to exclude, relative to INPUT (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Follow symbolic links while walking INPUT
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Exit with status 2 when any file fails to convert
    #[arg(long)]
    pub fail_on_error: bool,

    /// Summary format
    #[arg(long, value_enum)]
    pub format: Option<SummaryFormat>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// List the files that would be converted without converting them
    #[arg(long)]
    pub dry_run: bool,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors and machine-readable output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn run(self) -> Result<ExitCode> {
        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.verbose > 0, self.quiet);
        convert::execute(&self, &output)
    }

    /// Configuration values given on the command line
    ///
    /// Only flags the user actually passed are included so that lower
    /// configuration layers still apply to everything else.
    pub fn overrides(&self) -> Value {
        let mut conversion = Map::new();
        if let Some(from) = &self.from {
            conversion.insert("source_extension".into(), json!(from));
        }
        if let Some(to) = &self.to {
            conversion.insert("target_extension".into(), json!(to));
        }
        if self.ignore_case {
            conversion.insert("case_insensitive".into(), json!(true));
        }
        if self.follow_symlinks {
            conversion.insert("follow_symlinks".into(), json!(true));
        }
        if !self.exclude.is_empty() {
            conversion.insert("exclude".into(), json!(self.exclude));
        }

        let mut parallel = Map::new();
        if let Some(strategy) = self.strategy {
            parallel.insert("strategy".into(), json!(strategy));
        }
        if let Some(workers) = self.workers {
            parallel.insert("workers".into(), json!(workers));
        }

        let mut report = Map::new();
        if self.fail_on_error {
            report.insert("fail_on_error".into(), json!(true));
        }
        if let Some(format) = self.format {
            report.insert("format".into(), json!(format));
        }
        if self.no_progress {
            report.insert("show_progress".into(), json!(false));
        }

        json!({
            "conversion": conversion,
            "parallel": parallel,
            "report": report,
        })
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn,ignore=warn"),
            1 => tracing_subscriber::EnvFilter::new("info,ignore=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,ignore=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // stdout is reserved for the summary
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
