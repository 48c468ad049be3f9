//! # batchconv - parallel batch file conversion
//!
//! Walks an input directory tree, picks up every file with a given
//! extension, and writes a converted copy into a mirrored output tree using
//! a pool of worker threads.
//!
//! ## Features
//!
//! - **Resumable**: files whose output already exists are skipped, so an
//!   interrupted run continues where it stopped
//! - **Two distribution strategies**: static partition or a shared dynamic queue
//! - **Failure isolation**: a file that cannot be converted is reported, never fatal
//! - **Pluggable converters**: built-in JSON/TOML/YAML conversion, or any
//!   closure `Fn(&[u8]) -> Result<Vec<u8>, ConversionError>`
//!
//! ## Quick Start
//!
//! ```bash
//! # Convert every .json file under data/ into YAML under out/
//! batchconv data out --from json --to yaml
//!
//! # Fixed partition over 4 workers, JSON summary
//! batchconv data out -s static -j 4 --format json
//! ```

pub mod cli;
pub mod config;
pub mod convert;
pub mod discovery;
pub mod error;
pub mod parallel;
pub mod pipeline;
pub mod report;
pub mod worker;

pub use cli::{Cli, Output};
pub use config::BatchConfig;
pub use error::{ItemError, PipelineError};
pub use pipeline::Pipeline;

/// Result type alias for batchconv operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
