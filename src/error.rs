//! Error types for the conversion pipeline
//!
//! Run-level failures (`PipelineError`) abort before any worker starts.
//! Item-level failures (`ItemError`) never leave a worker: they are folded
//! into a failed [`Outcome`](crate::report::Outcome) and the run continues.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::convert::ConversionError;

/// Fatal errors that stop the pipeline before distribution
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read input root {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("input root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid exclude pattern `{pattern}`: {source}")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("no built-in converter for .{from} -> .{to} (supported: json, toml, yaml/yml, or identical extensions)")]
    UnsupportedConversion { from: String, to: String },

    #[error("{lost} of {expected} work items produced no outcome")]
    LostItems { expected: usize, lost: usize },
}

/// Per-item failures, reported through the run summary
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("failed to create output directory {}: {source}", path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to convert {}: {source}", path.display())]
    Transform {
        path: PathBuf,
        #[source]
        source: ConversionError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ItemError {
    /// Short machine-readable category used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Prepare { .. } => "prepare",
            ItemError::Read { .. } => "read",
            ItemError::Transform { .. } => "transform",
            ItemError::Write { .. } => "write",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_error_kind_and_message() {
        let err = ItemError::Read {
            path: PathBuf::from("in/a.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.kind(), "read");
        assert!(err.to_string().contains("in/a.json"));
        assert!(err.to_string().contains("gone"));

        let err = ItemError::Transform {
            path: PathBuf::from("in/b.json"),
            source: ConversionError::Other("boom".to_string()),
        };
        assert_eq!(err.kind(), "transform");
        assert!(err.to_string().ends_with("boom"));
    }

    #[test]
    fn test_lost_items_message() {
        let err = PipelineError::LostItems { expected: 7, lost: 2 };
        assert_eq!(err.to_string(), "2 of 7 work items produced no outcome");
    }
}
