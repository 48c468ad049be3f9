use anyhow::Result;
use crossbeam::channel::{Receiver, unbounded};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::partition::partition;
use super::queue::WorkQueue;
use crate::convert::Converter;
use crate::discovery::WorkItem;
use crate::report::Outcome;
use crate::worker::Worker;

/// How work items are handed to the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStrategy {
    /// One contiguous batch per worker, fixed before the run starts
    Static,
    /// Workers pull one item at a time from a shared queue
    Dynamic,
}

impl fmt::Display for DistributionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionStrategy::Static => write!(f, "static"),
            DistributionStrategy::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Runs a fixed pool of workers over a set of work items
///
/// Workers are scoped OS threads created for one call to [`run`](Self::run)
/// and joined before it returns. Outcomes stream over a channel to a single
/// aggregator thread supplied by the caller.
#[derive(Debug, Clone)]
pub struct WorkDistributor {
    strategy: DistributionStrategy,
    workers: usize,
    idle_timeout: Duration,
}

impl WorkDistributor {
    pub fn new(strategy: DistributionStrategy, workers: usize) -> Self {
        Self {
            strategy,
            workers: workers.max(1),
            idle_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn strategy(&self) -> DistributionStrategy {
        self.strategy
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Convert every item, feeding outcomes to `aggregate`
    ///
    /// Returns whatever `aggregate` returns once all workers have finished
    /// and the outcome channel is closed.
    pub fn run<C, A, R>(&self, items: Vec<WorkItem>, converter: &C, aggregate: A) -> Result<R>
    where
        C: Converter + ?Sized,
        A: FnOnce(Receiver<Outcome>) -> R + Send,
        R: Send,
    {
        let total = items.len();
        let (outcome_tx, outcome_rx) = unbounded();

        let (batches, queue) = match self.strategy {
            DistributionStrategy::Static => (partition(items, self.workers), None),
            DistributionStrategy::Dynamic => (
                Vec::new(),
                Some(WorkQueue::preloaded(items, self.idle_timeout)),
            ),
        };

        tracing::info!(
            "Distributing {} items over {} workers ({} strategy)",
            total,
            self.workers,
            self.strategy
        );

        crossbeam::thread::scope(|s| -> Result<R> {
            let aggregator = s.spawn(move |_| aggregate(outcome_rx));
            let mut workers = Vec::with_capacity(self.workers);

            for (worker_id, batch) in batches.into_iter().enumerate() {
                tracing::debug!("Worker {} assigned {} items", worker_id, batch.len());
                let outcomes = outcome_tx.clone();
                workers.push(s.spawn(move |_| {
                    Worker::new(worker_id, converter).run(batch.into_iter(), &outcomes)
                }));
            }

            if let Some(queue) = &queue {
                for worker_id in 0..self.workers {
                    let outcomes = outcome_tx.clone();
                    workers.push(s.spawn(move |_| Worker::new(worker_id, converter).run(queue, &outcomes)));
                }
            }

            // Drop the original sender so the aggregator sees the channel close
            drop(outcome_tx);

            let mut crashed = 0;
            for handle in workers {
                match handle.join() {
                    Ok(stats) => tracing::debug!(
                        "Worker {} joined: {} processed, {} failed",
                        stats.worker_id,
                        stats.processed,
                        stats.failed
                    ),
                    Err(_) => crashed += 1,
                }
            }
            if crashed > 0 {
                // Their missing outcomes show up as lost items in the summary
                tracing::error!("{} worker threads panicked", crashed);
            }

            if let Some(queue) = &queue {
                let stranded = queue.discard_remaining();
                if stranded > 0 {
                    tracing::warn!("{} queued items were never taken", stranded);
                }
                queue.join();
                tracing::debug!("Work queue drained ({} items dequeued)", queue.dequeued());
            }

            aggregator
                .join()
                .map_err(|_| anyhow::anyhow!("Result aggregator panicked"))
        })
        .map_err(|_| anyhow::anyhow!("Thread panic occurred during conversion"))?
    }
}

/// Calculate workers from available cores and configuration limits
///
/// ```text
/// 1. Detect available CPU cores: num_cpus::get()
/// 2. Apply percentage: cores * thread_percentage / 100
/// 3. Apply config limit: min(max_threads_config, percentage_result) if max_threads_config > 0
/// 4. Ensure minimum: max(1, final_result)
/// ```
pub fn calculate_optimal_workers(max_threads_config: usize, thread_percentage: u8) -> usize {
    let available_cores = num_cpus::get();

    let workers_by_percentage =
        std::cmp::max(1, (available_cores * thread_percentage as usize) / 100);

    // 0 means use percentage calculation only
    if max_threads_config > 0 {
        std::cmp::min(max_threads_config, workers_by_percentage)
    } else {
        workers_by_percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionError;
    use std::collections::{BTreeMap, HashSet};
    use std::fs;
    use tempfile::TempDir;

    fn setup(count: usize) -> (TempDir, Vec<WorkItem>) {
        let dir = TempDir::new().unwrap();
        let items = (0..count)
            .map(|i| {
                let input = dir.path().join(format!("{i}.txt"));
                fs::write(&input, format!("item {i}")).unwrap();
                WorkItem::new(input, dir.path().join(format!("{i}.out")))
            })
            .collect();
        (dir, items)
    }

    fn upper(input: &[u8]) -> Result<Vec<u8>, ConversionError> {
        Ok(input.to_ascii_uppercase())
    }

    fn collect_all(rx: Receiver<Outcome>) -> Vec<Outcome> {
        rx.iter().collect()
    }

    #[test]
    fn test_both_strategies_dispatch_each_item_once() {
        for strategy in [DistributionStrategy::Static, DistributionStrategy::Dynamic] {
            for workers in [1, 2, 3, 8, 40] {
                let (dir, items) = setup(23);
                let expected: HashSet<WorkItem> = items.iter().cloned().collect();

                let distributor = WorkDistributor::new(strategy, workers)
                    .with_idle_timeout(Duration::from_millis(200));
                let outcomes = distributor.run(items, &upper, collect_all).unwrap();

                assert_eq!(outcomes.len(), 23, "{strategy} with {workers} workers");
                let dispatched: HashSet<WorkItem> =
                    outcomes.iter().map(|o| o.item.clone()).collect();
                assert_eq!(dispatched, expected);
                assert!(outcomes.iter().all(|o| o.success));
                assert_eq!(
                    fs::read_to_string(dir.path().join("7.out")).unwrap(),
                    "ITEM 7"
                );
            }
        }
    }

    #[test]
    fn test_static_strategy_follows_partition() {
        let (_dir, items) = setup(7);
        let distributor = WorkDistributor::new(DistributionStrategy::Static, 3);
        let outcomes = distributor.run(items, &upper, collect_all).unwrap();

        let mut per_worker: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for outcome in &outcomes {
            let name = outcome.item.input().file_stem().unwrap().to_string_lossy().to_string();
            per_worker.entry(outcome.worker_id.unwrap()).or_default().push(name);
        }
        for names in per_worker.values_mut() {
            names.sort();
        }

        assert_eq!(per_worker[&0], vec!["0", "1"]);
        assert_eq!(per_worker[&1], vec!["2", "3"]);
        assert_eq!(per_worker[&2], vec!["4", "5", "6"]);
    }

    #[test]
    fn test_failing_item_does_not_stop_others() {
        for strategy in [DistributionStrategy::Static, DistributionStrategy::Dynamic] {
            let (_dir, items) = setup(10);
            let fail_on_three = |input: &[u8]| -> Result<Vec<u8>, ConversionError> {
                if input == b"item 3" {
                    Err(ConversionError::Other("rejected".to_string()))
                } else {
                    Ok(input.to_vec())
                }
            };

            let outcomes = WorkDistributor::new(strategy, 4)
                .run(items, &fail_on_three, collect_all)
                .unwrap();

            assert_eq!(outcomes.len(), 10);
            let failed: Vec<_> = outcomes.iter().filter(|o| !o.success).collect();
            assert_eq!(failed.len(), 1);
            assert!(failed[0].item.input().ends_with("3.txt"));
        }
    }

    #[test]
    fn test_empty_run() {
        for strategy in [DistributionStrategy::Static, DistributionStrategy::Dynamic] {
            let outcomes = WorkDistributor::new(strategy, 3)
                .run(Vec::new(), &upper, collect_all)
                .unwrap();
            assert!(outcomes.is_empty());
        }
    }

    #[test]
    fn test_optimal_workers_calculation() {
        assert!(calculate_optimal_workers(0, 75) >= 1);
        assert!(calculate_optimal_workers(2, 100) <= 2);
        assert_eq!(calculate_optimal_workers(0, 100), num_cpus::get());
    }
}
