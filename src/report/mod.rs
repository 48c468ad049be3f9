//! Outcome collection and the end-of-run summary

pub mod aggregator;
pub mod outcome;
pub mod render;

pub use aggregator::{FailureDetail, ResultAggregator, RunInfo, RunStatus, RunSummary};
pub use outcome::Outcome;
pub use render::{SummaryFormat, print_summary, to_json};
