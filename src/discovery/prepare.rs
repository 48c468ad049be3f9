use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::types::WorkItem;
use crate::error::ItemError;
use crate::report::Outcome;

/// Creates output directories ahead of the workers
///
/// Directories are created once per distinct parent; a parent that another
/// process (or a previous run) already created is not an error.
#[derive(Debug, Default)]
pub struct OutputPreparer {
    ready: HashSet<PathBuf>,
}

impl OutputPreparer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure the parent directory of `item`'s output exists
    pub fn prepare(&mut self, item: &WorkItem) -> Result<(), ItemError> {
        let Some(parent) = item.output().parent() else {
            return Ok(());
        };

        if self.ready.contains(parent) {
            return Ok(());
        }

        ensure_dir(parent).map_err(|source| ItemError::Prepare {
            path: parent.to_path_buf(),
            source,
        })?;
        self.ready.insert(parent.to_path_buf());
        Ok(())
    }

    /// Prepare every item, splitting ready items from failed outcomes
    pub fn prepare_all(&mut self, items: Vec<WorkItem>) -> (Vec<WorkItem>, Vec<Outcome>) {
        let mut ready = Vec::with_capacity(items.len());
        let mut failed = Vec::new();

        for item in items {
            match self.prepare(&item) {
                Ok(()) => ready.push(item),
                Err(err) => {
                    tracing::warn!("{}", err);
                    failed.push(Outcome::failed(item, None, err));
                }
            }
        }

        (ready, failed)
    }
}

/// Recursively create `dir`, tolerating concurrent creators
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(err) => Err(err),
    }
}
