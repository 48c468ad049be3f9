//! Per-file transforms
//!
//! The pipeline treats a conversion as an opaque `bytes -> bytes` function.
//! Anything implementing [`Converter`] can be plugged in, including plain
//! closures:
//!
//! ```rust
//! use batchconv::convert::{ConversionError, Converter};
//!
//! let upper = |input: &[u8]| -> Result<Vec<u8>, ConversionError> {
//!     Ok(input.to_ascii_uppercase())
//! };
//! assert_eq!(upper.convert(b"abc").unwrap(), b"ABC");
//! ```

pub mod formats;

pub use formats::{CopyConverter, DataFormat, FormatConverter, resolve};

use thiserror::Error;

/// Error returned by a [`Converter`]
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("input is not valid {format}: {message}")]
    Parse { format: DataFormat, message: String },

    #[error("cannot express input as {format}: {message}")]
    Render { format: DataFormat, message: String },

    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Other(String),
}

/// A CPU-bound transform applied to one whole file
///
/// Implementations are shared by every worker thread, so they must be
/// `Send + Sync` and should hold no per-call mutable state.
pub trait Converter: Send + Sync {
    fn convert(&self, input: &[u8]) -> Result<Vec<u8>, ConversionError>;

    /// Label used in logs and the run summary
    fn name(&self) -> String {
        "custom".to_string()
    }
}

impl<F> Converter for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, ConversionError> + Send + Sync,
{
    fn convert(&self, input: &[u8]) -> Result<Vec<u8>, ConversionError> {
        self(input)
    }
}
