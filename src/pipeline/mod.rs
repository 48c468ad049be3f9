//! End-to-end conversion run
//!
//! ```text
//! PathFilter ──▶ OutputPreparer ──▶ WorkDistributor ──▶ N × Worker ──▶ ResultAggregator
//! (discover)     (mkdir -p once)    (static | dynamic)   (read/convert/write)   (summary)
//! ```
//!
//! Only discovery errors abort a run. Every item that makes it past
//! discovery produces exactly one outcome, successful or not.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::BatchConfig;
use crate::convert::{self, Converter};
use crate::discovery::{Discovery, OutputPreparer, PathFilter};
use crate::parallel::{ConversionProgress, WorkDistributor};
use crate::report::{ResultAggregator, RunInfo, RunSummary};

/// A configured conversion job over one input/output root pair
pub struct Pipeline {
    config: BatchConfig,
    converter: Box<dyn Converter>,
    show_progress: bool,
}

impl Pipeline {
    /// Pipeline using the built-in converter for the configured extensions
    pub fn from_config(config: BatchConfig) -> Result<Self> {
        let converter = convert::resolve(
            config.conversion.source_extension.trim_start_matches('.'),
            config.conversion.target_extension.trim_start_matches('.'),
        )?;
        Ok(Self::new(config, converter))
    }

    /// Pipeline with a caller-supplied converter
    pub fn new(config: BatchConfig, converter: Box<dyn Converter>) -> Self {
        let show_progress = config.report.show_progress;
        Self {
            config,
            converter,
            show_progress,
        }
    }

    /// Override the progress bar setting from the config
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn converter_name(&self) -> String {
        self.converter.name()
    }

    /// Number of workers a run will use
    pub fn worker_count(&self) -> usize {
        self.config.parallel.worker_count()
    }

    pub fn path_filter(&self, input_root: &Path, output_root: &Path) -> PathFilter {
        PathFilter::new(input_root, output_root, &self.config.conversion)
    }

    /// Discover pending work without converting anything
    pub fn plan(&self, input_root: &Path, output_root: &Path) -> Result<Discovery> {
        Ok(self.path_filter(input_root, output_root).scan()?)
    }

    /// Convert every pending file under `input_root` into `output_root`
    pub fn run(&self, input_root: &Path, output_root: &Path) -> Result<RunSummary> {
        let start_time = Instant::now();
        let parallel = &self.config.parallel;

        let discovery = self.plan(input_root, output_root)?;
        let dispatched = discovery.items.len();

        let mut preparer = OutputPreparer::new();
        let (ready, prepare_failures) = preparer.prepare_all(discovery.items);

        let progress = if self.show_progress && dispatched > 0 {
            ConversionProgress::new(dispatched)
        } else {
            ConversionProgress::hidden()
        };

        let mut aggregator = ResultAggregator::new(dispatched);
        for outcome in prepare_failures {
            progress.record(&outcome);
            aggregator.record(outcome);
        }

        let distributor = WorkDistributor::new(parallel.strategy, parallel.worker_count())
            .with_idle_timeout(parallel.idle_timeout());

        let aggregator = if ready.is_empty() {
            tracing::info!("Nothing to convert");
            progress.finish();
            aggregator
        } else {
            distributor.run(ready, self.converter.as_ref(), |outcomes| {
                aggregator.collect(outcomes, &progress)
            })?
        };

        let run = RunInfo {
            input_root: PathBuf::from(input_root),
            output_root: PathBuf::from(output_root),
            converter: self.converter.name(),
            strategy: distributor.strategy(),
            workers: distributor.workers(),
            candidates: discovery.candidates,
            already_converted: discovery.already_converted,
            duplicates: discovery.duplicates,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };
        let summary = aggregator.finish(run);

        tracing::info!(
            "Finished {} of {} items in {}ms ({} failed)",
            summary.outcomes,
            summary.dispatched,
            summary.run.duration_ms,
            summary.failed
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionError;
    use crate::parallel::DistributionStrategy;
    use crate::report::RunStatus;
    use std::fs;
    use tempfile::TempDir;

    const FILES: [&str; 7] = [
        "a.json",
        "sub/b.json",
        "sub/sub2/c.json",
        "d.json",
        "sub/e.json",
        "other/f.json",
        "other/deep/er/g.json",
    ];

    fn input_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        for (i, name) in FILES.iter().enumerate() {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, format!("{{\"id\": {i}, \"name\": \"{name}\"}}")).unwrap();
        }
        fs::write(dir.path().join("sub/ignored.txt"), "not json").unwrap();
        dir
    }

    fn config(strategy: DistributionStrategy, workers: usize) -> BatchConfig {
        let mut config = BatchConfig::default();
        config.parallel.strategy = strategy;
        config.parallel.workers = workers;
        config.parallel.idle_timeout_ms = 200;
        config.report.show_progress = false;
        config
    }

    #[test]
    fn test_seven_files_both_strategies_then_rerun_is_empty() {
        for strategy in [DistributionStrategy::Static, DistributionStrategy::Dynamic] {
            let input = input_tree();
            let output = TempDir::new().unwrap();
            let pipeline = Pipeline::from_config(config(strategy, 3)).unwrap();

            let summary = pipeline.run(input.path(), output.path()).unwrap();

            assert_eq!(summary.dispatched, 7);
            assert_eq!(summary.outcomes, 7);
            assert_eq!(summary.succeeded, 7);
            assert_eq!(summary.status(), RunStatus::Complete);
            assert_eq!(summary.run.workers, 3);
            for name in FILES {
                let converted = output.path().join(name).with_extension("yaml");
                assert!(converted.is_file(), "{} missing", converted.display());
            }
            let yaml = fs::read_to_string(output.path().join("sub/sub2/c.yaml")).unwrap();
            assert!(yaml.contains("id: 2"));

            if strategy == DistributionStrategy::Static {
                let mut sizes: Vec<usize> = summary.per_worker.values().copied().collect();
                sizes.sort();
                assert_eq!(sizes, vec![2, 2, 3]);
            }

            // Outputs act as the resume checkpoint
            let rerun = pipeline.run(input.path(), output.path()).unwrap();
            assert_eq!(rerun.dispatched, 0);
            assert_eq!(rerun.outcomes, 0);
            assert_eq!(rerun.run.already_converted, 7);
            assert_eq!(rerun.status(), RunStatus::Complete);
        }
    }

    #[test]
    fn test_partial_previous_run_resumes() {
        let input = input_tree();
        let output = TempDir::new().unwrap();
        fs::write(output.path().join("a.yaml"), "done: true\n").unwrap();

        let pipeline = Pipeline::from_config(config(DistributionStrategy::Dynamic, 2)).unwrap();
        let summary = pipeline.run(input.path(), output.path()).unwrap();

        assert_eq!(summary.dispatched, 6);
        assert_eq!(summary.run.already_converted, 1);
        // Existing output is left alone
        assert_eq!(
            fs::read_to_string(output.path().join("a.yaml")).unwrap(),
            "done: true\n"
        );
    }

    #[test]
    fn test_single_failing_item_is_isolated() {
        for strategy in [DistributionStrategy::Static, DistributionStrategy::Dynamic] {
            let input = input_tree();
            let output = TempDir::new().unwrap();
            let converter = |bytes: &[u8]| -> Result<Vec<u8>, ConversionError> {
                if String::from_utf8_lossy(bytes).contains("\"id\": 4") {
                    Err(ConversionError::Other("cannot convert item 4".to_string()))
                } else {
                    Ok(bytes.to_vec())
                }
            };

            let pipeline = Pipeline::new(config(strategy, 3), Box::new(converter));
            let summary = pipeline.run(input.path(), output.path()).unwrap();

            assert_eq!(summary.outcomes, 7);
            assert_eq!(summary.failed, 1);
            assert_eq!(summary.succeeded, 6);
            assert_eq!(summary.lost(), 0);
            assert_eq!(summary.status(), RunStatus::CompletedWithFailures);
            assert_eq!(summary.exit_code(false), 0);
            assert!(summary.failures[0].input.ends_with("sub/e.json"));
            assert_eq!(summary.failures[0].kind, "transform");
            assert!(!output.path().join("sub/e.yaml").exists());
        }
    }

    #[test]
    fn test_prepare_failure_is_reported_not_fatal() {
        let input = input_tree();
        let output = TempDir::new().unwrap();
        // "other" must be a directory in the output tree
        fs::write(output.path().join("other"), "").unwrap();

        let pipeline = Pipeline::from_config(config(DistributionStrategy::Static, 2)).unwrap();
        let summary = pipeline.run(input.path(), output.path()).unwrap();

        assert_eq!(summary.dispatched, 7);
        assert_eq!(summary.outcomes, 7);
        assert_eq!(summary.failed, 2);
        assert!(summary.failures.iter().all(|f| f.kind == "prepare"));
        assert_eq!(summary.lost(), 0);
    }

    #[test]
    fn test_missing_input_root_aborts() {
        let output = TempDir::new().unwrap();
        let pipeline = Pipeline::from_config(config(DistributionStrategy::Dynamic, 2)).unwrap();

        let err = pipeline
            .run(Path::new("/no/such/input/root"), output.path())
            .unwrap_err();
        assert!(err.to_string().contains("/no/such/input/root"));
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unsupported_extension_pair() {
        let mut cfg = config(DistributionStrategy::Dynamic, 1);
        cfg.conversion.source_extension = "svg".to_string();
        cfg.conversion.target_extension = "png".to_string();
        assert!(Pipeline::from_config(cfg).is_err());
    }

    #[test]
    fn test_plan_does_not_write() {
        let input = input_tree();
        let output = TempDir::new().unwrap();
        let pipeline = Pipeline::from_config(config(DistributionStrategy::Static, 2)).unwrap();

        let discovery = pipeline.plan(input.path(), output.path()).unwrap();

        assert_eq!(discovery.items.len(), 7);
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }
}
