//! Work discovery: which inputs still need converting, and where they go
//!
//! [`PathFilter`] walks the input tree and yields a [`WorkItem`] for every
//! matching file whose mirrored output does not exist yet. Existing outputs
//! are the only resume state, so an interrupted run picks up where it
//! stopped. [`OutputPreparer`] then creates output directories up front so
//! workers only ever write files.

pub mod filter;
pub mod prepare;
pub mod types;

pub use filter::PathFilter;
pub use prepare::{OutputPreparer, ensure_dir};
pub use types::{Discovery, WorkItem};
