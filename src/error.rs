//! Error types for configuration, normalization, ADIF input and output.

use std::io;

use thiserror::Error;

use crate::{
    qso::MalformedRecord,
    types::{FieldKind, SourceId},
};

/// Configuration could not be loaded or compiled.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A pattern in the configuration is not a valid regular expression.
    #[error("invalid pattern for {name}: {source}")]
    Pattern {
        /// Which configuration entry carried the pattern.
        name: String,
        /// Underlying compile error.
        source: regex::Error,
    },
    /// Reading the configuration file failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The configuration file is not valid JSON for [`crate::config::MergeConfig`].
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A record failed validation and was excluded from merging.
#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    /// Mandatory fields were missing or could not form a timestamp.
    #[error("malformed record: {0}")]
    Malformed(MalformedRecord),
}

/// One field value could not be converted to its declared kind.
///
/// Only the field is dropped; the record itself survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_id}: {field}={value:?} is not a valid {kind:?}")]
pub struct FieldCoercionError {
    /// Source of the record.
    pub source_id: SourceId,
    /// Field name.
    pub field: String,
    /// Trimmed raw value.
    pub value: String,
    /// Kind the value should have had.
    pub kind: FieldKind,
}

/// ADIF text could not be parsed.
#[derive(Debug, Error)]
pub enum AdifError {
    /// A `<` was never closed by `>`.
    #[error("unterminated tag at offset {0}")]
    UnterminatedTag(usize),
    /// The length part of a tag is not a number.
    #[error("bad length in tag <{tag}> at offset {offset}")]
    BadLength {
        /// Tag text.
        tag: String,
        /// Character offset of the tag.
        offset: usize,
    },
    /// Fewer characters remain than the tag announced.
    #[error("field {field} truncated at offset {offset}")]
    Truncated {
        /// Field name.
        field: String,
        /// Character offset of the tag.
        offset: usize,
    },
    /// Reading the file failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Writing merged records failed.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Underlying stream error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// CSV encoding error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Writing the problem report failed.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Underlying stream error.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// JSON encoding error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
