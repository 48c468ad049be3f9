//! Parallel execution of conversions
//!
//! This module owns the worker pool and decides which worker gets which
//! item. It knows nothing about file formats; the per-item work lives in
//! [`crate::worker`].
//!
//! # Strategies
//!
//! ```text
//! Static                               Dynamic
//! ┌───────────────┐                    ┌───────────────────────┐
//! │ items[0..c]   │──▶ worker 0        │  shared FIFO (closed) │
//! │ items[c..2c]  │──▶ worker 1        └──────────┬────────────┘
//! │ items[2c..]   │──▶ worker 2 (rest)     pop ◀──┼──▶ pop
//! └───────────────┘                       worker 0 ... worker N
//! ```
//!
//! Static partition decides everything up front and needs no coordination,
//! but a worker that finishes early sits idle. The dynamic queue keeps every
//! worker busy until the queue is drained and signals completion through
//! [`WorkQueue::join`].
//!
//! # Example
//!
//! ```rust,no_run
//! use batchconv::convert::CopyConverter;
//! use batchconv::discovery::WorkItem;
//! use batchconv::parallel::{DistributionStrategy, WorkDistributor, calculate_optimal_workers};
//!
//! let items = vec![WorkItem::new("in/a.txt", "out/a.txt")];
//! let workers = calculate_optimal_workers(0, 100);
//! let outcomes = WorkDistributor::new(DistributionStrategy::Dynamic, workers)
//!     .run(items, &CopyConverter, |rx| rx.iter().count())
//!     .unwrap();
//! assert_eq!(outcomes, 1);
//! ```

pub mod core;
pub mod partition;
pub mod progress;
pub mod queue;

pub use self::core::{DistributionStrategy, WorkDistributor, calculate_optimal_workers};
pub use partition::{chunk_size, partition};
pub use progress::ConversionProgress;
pub use queue::WorkQueue;
