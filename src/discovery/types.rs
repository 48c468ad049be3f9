use serde::Serialize;
use std::path::{Path, PathBuf};

/// One file to convert: where to read it and where its result goes
///
/// Items are immutable once discovered and are handed to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WorkItem {
    input: PathBuf,
    output: PathBuf,
}

impl WorkItem {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Result of walking the input tree
#[derive(Debug, Default, Serialize)]
pub struct Discovery {
    /// Items whose output does not exist yet, in walk order
    pub items: Vec<WorkItem>,
    /// Matching inputs seen, including already converted ones
    pub candidates: usize,
    /// Inputs skipped because their output already exists
    pub already_converted: usize,
    /// Inputs skipped because another input maps to the same output
    pub duplicates: usize,
}
