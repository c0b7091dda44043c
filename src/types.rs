//! Shared primitive identifiers and field classification enums.

use serde::{Deserialize, Serialize};

/// Originating data source of a record, usually the input file name.
pub type SourceId = String;
/// Composite QSO identifier used in problem reports.
pub type QsoId = String;
/// Position of a record in the overall input stream.
pub type InputSeq = u64;

/// Storage kind a field value is coerced into during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free-form string.
    Text,
    /// Signed integer.
    Integer,
    /// Non-negative integer.
    PositiveInteger,
    /// Decimal number, collapsed to an integer when whole.
    Number,
    /// Zone code, written as two zero-padded digits.
    Zone,
}

/// Merge policy class a field name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    /// Name, address, comment and similar human-entered text.
    FreeText,
    /// Times and locators where a longer value is a more precise one.
    Precision,
    /// Great-circle distance.
    Distance,
    /// Frequencies in MHz.
    Frequency,
    /// QSL sent/received status codes.
    Confirmation,
    /// Signal reports.
    SignalReport,
    /// Numeric codes that some sources leave out or write as zero.
    OmittableCode,
    /// No field-specific policy.
    Generic,
}
