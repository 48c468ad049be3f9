use crossbeam::channel::Receiver;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::outcome::Outcome;
use crate::parallel::{ConversionProgress, DistributionStrategy};

/// Everything known about a run before the first worker starts
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub converter: String,
    pub strategy: DistributionStrategy,
    pub workers: usize,
    pub candidates: usize,
    pub already_converted: usize,
    pub duplicates: usize,
    pub duration_ms: u64,
}

/// Context for one failed item
#[derive(Debug, Clone, Serialize)]
pub struct FailureDetail {
    pub input: PathBuf,
    pub output: PathBuf,
    pub kind: String,
    pub message: String,
}

/// Final report of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    #[serde(flatten)]
    pub run: RunInfo,
    /// Items that entered the pipeline after filtering
    pub dispatched: usize,
    pub outcomes: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_written: u64,
    /// Items handled per worker id
    pub per_worker: BTreeMap<usize, usize>,
    pub failures: Vec<FailureDetail>,
}

/// Overall verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every item produced an outcome and every conversion succeeded
    Complete,
    /// Every item produced an outcome, some conversions failed
    CompletedWithFailures,
    /// At least one item never produced an outcome
    Incomplete,
}

impl RunSummary {
    /// Dispatched items without an outcome
    pub fn lost(&self) -> usize {
        self.dispatched.saturating_sub(self.outcomes)
    }

    pub fn status(&self) -> RunStatus {
        if self.lost() > 0 {
            RunStatus::Incomplete
        } else if self.failed > 0 {
            RunStatus::CompletedWithFailures
        } else {
            RunStatus::Complete
        }
    }

    /// Process exit code for this run
    ///
    /// Item failures only turn into a non-zero code when `fail_on_error` is
    /// set; a lost item always does.
    pub fn exit_code(&self, fail_on_error: bool) -> u8 {
        match self.status() {
            RunStatus::Complete => 0,
            RunStatus::CompletedWithFailures if fail_on_error => 2,
            RunStatus::CompletedWithFailures => 0,
            RunStatus::Incomplete => 1,
        }
    }
}

/// Collects outcomes from every worker into a [`RunSummary`]
///
/// Runs on a single thread fed by the outcome channel, so counting needs no
/// synchronization.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    expected: usize,
    outcomes: usize,
    succeeded: usize,
    bytes_written: u64,
    per_worker: BTreeMap<usize, usize>,
    failures: Vec<FailureDetail>,
}

impl ResultAggregator {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.outcomes += 1;

        if let Some(worker_id) = outcome.worker_id {
            *self.per_worker.entry(worker_id).or_insert(0) += 1;
        }

        if outcome.success {
            self.succeeded += 1;
            self.bytes_written += outcome.bytes_written;
            return;
        }

        let (kind, message) = match &outcome.error {
            Some(err) => (err.kind().to_string(), err.to_string()),
            None => ("unknown".to_string(), "conversion failed".to_string()),
        };
        self.failures.push(FailureDetail {
            input: outcome.item.input().to_path_buf(),
            output: outcome.item.output().to_path_buf(),
            kind,
            message,
        });
    }

    /// Drain the outcome channel until every sender is gone
    pub fn collect(mut self, outcomes: Receiver<Outcome>, progress: &ConversionProgress) -> Self {
        while let Ok(outcome) = outcomes.recv() {
            progress.record(&outcome);
            self.record(outcome);
        }
        progress.finish();
        self
    }

    pub fn outcomes(&self) -> usize {
        self.outcomes
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn finish(self, run: RunInfo) -> RunSummary {
        let failed = self.failures.len();
        RunSummary {
            run,
            dispatched: self.expected,
            outcomes: self.outcomes,
            succeeded: self.succeeded,
            failed,
            bytes_written: self.bytes_written,
            per_worker: self.per_worker,
            failures: self.failures,
        }
    }
}
