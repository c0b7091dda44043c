//! QSO record types: raw input maps, typed normalized records, merge results.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::{InputSeq, QsoId, SourceId};

/// Field name of the contacted station's call sign.
pub const CALL: &str = "CALL";
/// Field name of the contact date (`YYYYMMDD`).
pub const QSO_DATE: &str = "QSO_DATE";
/// Field name of the contact start time (`HHMM` or `HHMMSS`).
pub const TIME_ON: &str = "TIME_ON";
/// Field name of the band.
pub const BAND: &str = "BAND";
/// Field name of the mode.
pub const MODE: &str = "MODE";
/// Field name of the sub-mode.
pub const SUBMODE: &str = "SUBMODE";

/// Untyped field map as produced by a log file parser.
///
/// Field names are upper-cased on insertion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, String>,
}

impl RawRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under the upper-cased `name`, returning any previous value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.fields
            .insert(name.as_ref().to_ascii_uppercase(), value.into())
    }

    /// Looks up a field by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the record into its field map.
    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut rec = Self::new();
        for (k, v) in iter {
            rec.insert(k, v);
        }
        rec
    }
}

/// Typed field value of a normalized record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// String value.
    Text(String),
    /// Signed integer.
    Int(i64),
    /// Non-negative integer.
    UInt(u64),
    /// Decimal number.
    Number(f64),
    /// Zone code.
    Zone(u32),
}

impl FieldValue {
    /// Borrows the string of a [`FieldValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(_) => None,
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Number(v) => Some(*v),
            Self::Zone(v) => Some(f64::from(*v)),
        }
    }

    /// True for numeric zero.
    pub fn is_zero(&self) -> bool {
        self.as_f64() == Some(0.0)
    }

    /// True for an empty (or blank) string.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    /// True when the value carries no information: blank text or zero.
    pub fn is_unset(&self) -> bool {
        self.is_blank() || self.is_zero()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Zone(v) => write!(f, "{v:02}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Typed, validated record ready for merging.
///
/// Provenance, input position and the parsed start time live beside the
/// field map and are never serialized with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    /// Typed fields keyed by upper-case name.
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
    /// Source the record was read from.
    #[serde(skip)]
    pub source: SourceId,
    /// Position in the overall input, used as the sort tie-break.
    #[serde(skip)]
    pub seq: InputSeq,
    /// Contact start instant built from `QSO_DATE` and `TIME_ON`.
    #[serde(skip)]
    pub timestamp: NaiveDateTime,
}

impl NormalizedRecord {
    /// Looks up a field value.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// String view of a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Renders every field back to its string form.
    pub fn to_raw(&self) -> RawRecord {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_string()))
            .collect()
    }

    /// Report identifier: call, date, start time and band joined by `_`.
    pub fn qso_id(&self) -> QsoId {
        let part = |name: &str| self.get(name).map(|v| v.to_string()).unwrap_or_default();
        format!(
            "{}_{}_{}_{}",
            part(CALL),
            part(QSO_DATE),
            part(TIME_ON),
            part(BAND)
        )
    }
}

/// Fields of a duplicate that could not be reconciled, keyed by the duplicate's source.
pub type Residue = BTreeMap<SourceId, BTreeMap<String, FieldValue>>;

/// Primary record after absorbing its duplicates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRecord {
    /// Merged record.
    #[serde(flatten)]
    pub record: NormalizedRecord,
    /// Sources that contributed, primary first.
    #[serde(skip)]
    pub sources: Vec<SourceId>,
    /// Unreconciled duplicate fields.
    #[serde(rename = "_UNMERGED", skip_serializing_if = "BTreeMap::is_empty")]
    pub unmerged: Residue,
}

impl ResolvedRecord {
    /// Wraps a record that has not absorbed anything yet.
    pub fn new(record: NormalizedRecord) -> Self {
        let sources = vec![record.source.clone()];
        Self {
            record,
            sources,
            unmerged: Residue::new(),
        }
    }

    /// True when some duplicate left residue behind.
    pub fn is_problem(&self) -> bool {
        !self.unmerged.is_empty()
    }

    /// Typed fields of the merged record.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.record.fields
    }

    /// Looks up a merged field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.record.get(name)
    }

    /// See [`NormalizedRecord::qso_id`].
    pub fn qso_id(&self) -> QsoId {
        self.record.qso_id()
    }
}

/// Raw record rejected by validation, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedRecord {
    /// Source the record was read from.
    pub source: SourceId,
    /// Record as received.
    pub record: RawRecord,
    /// Mandatory fields that were absent or empty.
    pub missing: Vec<String>,
    /// Mandatory fields present but unusable as a timestamp.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid: Vec<String>,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: missing {:?}", self.source, self.missing)?;
        if !self.invalid.is_empty() {
            write!(f, ", invalid {:?}", self.invalid)?;
        }
        Ok(())
    }
}
