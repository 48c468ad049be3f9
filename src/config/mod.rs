//! Configuration management for batchconv
//!
//! Settings are layered with figment (see [`core`]) and extracted into the
//! typed [`BatchConfig`] below.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::parallel::{DistributionStrategy, calculate_optimal_workers};
use crate::report::SummaryFormat;

pub mod core;

pub use self::core::ConfigLoader;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BatchConfig {
    pub conversion: ConversionConfig,
    pub parallel: ParallelConfig,
    pub report: ReportConfig,
}

/// Which files to convert and how they map into the output tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Extension of input files to pick up, without the dot
    pub source_extension: String,

    /// Extension given to written output files, without the dot
    pub target_extension: String,

    /// Match `source_extension` ignoring ASCII case
    pub case_insensitive: bool,

    /// Follow symbolic links while walking the input tree
    pub follow_symlinks: bool,

    /// Glob patterns (relative to the input root) to leave out
    pub exclude: Vec<String>,
}

/// Worker pool sizing and work distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    pub strategy: DistributionStrategy,

    /// Fixed worker count (0 = derive from available cores)
    pub workers: usize,

    /// Percentage of CPU cores to use when `workers` is 0 (1-100)
    pub thread_percentage: u8,

    /// How long a dynamic-queue worker waits for an item before exiting
    pub idle_timeout_ms: u64,
}

/// Summary output and exit status policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Exit non-zero when any item failed to convert
    pub fail_on_error: bool,

    pub format: SummaryFormat,

    pub show_progress: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            source_extension: "json".to_string(),
            target_extension: "yaml".to_string(),
            case_insensitive: false,
            follow_symlinks: false,
            exclude: vec![],
        }
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            strategy: DistributionStrategy::Dynamic,
            workers: 0,
            thread_percentage: 100,
            idle_timeout_ms: 1000,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            fail_on_error: false,
            format: SummaryFormat::Text,
            show_progress: true,
        }
    }
}

impl ParallelConfig {
    /// Number of workers to spawn for a run
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            calculate_optimal_workers(0, self.thread_percentage)
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl BatchConfig {
    /// Load layered configuration, see [`ConfigLoader`]
    pub fn load(custom_config: Option<&str>, overrides: Option<serde_json::Value>) -> Result<Self> {
        let config: BatchConfig = ConfigLoader::new(custom_config, overrides).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let conversion = &self.conversion;
        if conversion.source_extension.trim_start_matches('.').is_empty() {
            anyhow::bail!("conversion.source_extension cannot be empty");
        }
        if conversion.target_extension.trim_start_matches('.').is_empty() {
            anyhow::bail!("conversion.target_extension cannot be empty");
        }

        let parallel = &self.parallel;
        if parallel.thread_percentage == 0 || parallel.thread_percentage > 100 {
            anyhow::bail!(
                "parallel.thread_percentage must be between 1 and 100, got {}",
                parallel.thread_percentage
            );
        }
        if parallel.idle_timeout_ms == 0 {
            anyhow::bail!("parallel.idle_timeout_ms cannot be 0");
        }

        Ok(())
    }
}
