//! Built-in converters for structured data files and plain copies

use serde::Serialize;
use std::fmt;

use super::{ConversionError, Converter};
use crate::error::PipelineError;

/// Structured data formats understood by [`FormatConverter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Json,
    Toml,
    Yaml,
}

impl DataFormat {
    /// Map a file extension (without the leading dot) to a format
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(DataFormat::Json),
            "toml" => Some(DataFormat::Toml),
            "yaml" | "yml" => Some(DataFormat::Yaml),
            _ => None,
        }
    }

    fn parse(self, input: &[u8]) -> Result<serde_json::Value, ConversionError> {
        let text = std::str::from_utf8(input)?;
        let parse_error = |message: String| ConversionError::Parse {
            format: self,
            message,
        };

        match self {
            DataFormat::Json => serde_json::from_str(text).map_err(|e| parse_error(e.to_string())),
            DataFormat::Toml => toml::from_str(text).map_err(|e| parse_error(e.to_string())),
            DataFormat::Yaml => serde_yml::from_str(text).map_err(|e| parse_error(e.to_string())),
        }
    }

    fn render(self, value: &serde_json::Value) -> Result<String, ConversionError> {
        let render_error = |message: String| ConversionError::Render {
            format: self,
            message,
        };

        match self {
            DataFormat::Json => serde_json::to_string_pretty(value)
                .map(|mut out| {
                    out.push('\n');
                    out
                })
                .map_err(|e| render_error(e.to_string())),
            DataFormat::Toml => {
                toml::to_string_pretty(value).map_err(|e| render_error(e.to_string()))
            }
            DataFormat::Yaml => serde_yml::to_string(value).map_err(|e| render_error(e.to_string())),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::Json => write!(f, "JSON"),
            DataFormat::Toml => write!(f, "TOML"),
            DataFormat::Yaml => write!(f, "YAML"),
        }
    }
}

/// Re-encodes a structured document from one format into another
#[derive(Debug, Clone, Copy)]
pub struct FormatConverter {
    from: DataFormat,
    to: DataFormat,
}

impl FormatConverter {
    pub fn new(from: DataFormat, to: DataFormat) -> Self {
        Self { from, to }
    }
}

impl Converter for FormatConverter {
    fn convert(&self, input: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let value = self.from.parse(input)?;
        Ok(self.to.render(&value)?.into_bytes())
    }

    fn name(&self) -> String {
        format!("{}-to-{}", self.from, self.to).to_lowercase()
    }
}

/// Byte-for-byte copy
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyConverter;

impl Converter for CopyConverter {
    fn convert(&self, input: &[u8]) -> Result<Vec<u8>, ConversionError> {
        Ok(input.to_vec())
    }

    fn name(&self) -> String {
        "copy".to_string()
    }
}

/// Pick the built-in converter for a source/target extension pair
pub fn resolve(from: &str, to: &str) -> Result<Box<dyn Converter>, PipelineError> {
    match (DataFormat::from_extension(from), DataFormat::from_extension(to)) {
        (Some(source), Some(target)) => Ok(Box::new(FormatConverter::new(source, target))),
        _ if from.eq_ignore_ascii_case(to) => Ok(Box::new(CopyConverter)),
        _ => Err(PipelineError::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}
