//! Per-record validation, coercion and canonicalization.
//!
//! Every rule here is idempotent: feeding [`NormalizedRecord::to_raw`] back
//! through [`Normalizer::normalize`] reproduces the same record.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    config::Policy,
    core::key::parse_timestamp,
    error::{FieldCoercionError, NormalizeError},
    qso::{FieldValue, MODE, MalformedRecord, NormalizedRecord, QSO_DATE, RawRecord, SUBMODE, TIME_ON},
    types::{FieldKind, InputSeq},
};

/// Output of a successful normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The typed record.
    pub record: NormalizedRecord,
    /// Fields dropped because their value did not fit the field's kind.
    pub coercion_errors: Vec<FieldCoercionError>,
}

/// Turns [`RawRecord`]s into [`NormalizedRecord`]s according to a [`Policy`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    policy: Arc<Policy>,
}

impl Normalizer {
    /// Creates a normalizer sharing `policy`.
    pub fn new(policy: Arc<Policy>) -> Self {
        Self { policy }
    }

    /// Validates and normalizes one record read from `source`.
    ///
    /// A record missing any mandatory field, or whose date and start time do
    /// not form a timestamp, is rejected whole. A field whose value does not
    /// fit its kind is dropped and reported in [`Normalized::coercion_errors`].
    pub fn normalize(&self, raw: RawRecord, source: &str, seq: InputSeq) -> Result<Normalized, NormalizeError> {
        let cfg = self.policy.config();
        let mut fields: BTreeMap<String, String> = raw
            .iter()
            .map(|(k, v)| (k.to_string(), v.trim().to_string()))
            .collect();

        let missing: Vec<String> = cfg
            .mandatory_fields
            .iter()
            .filter(|f| fields.get(f.as_str()).map_or(true, |v| v.is_empty()))
            .cloned()
            .collect();

        let mut invalid = Vec::new();
        let mut timestamp = None;
        if missing.is_empty() {
            let date = fields.get(QSO_DATE).map(String::as_str).unwrap_or_default();
            let time = fields.get(TIME_ON).map(String::as_str).unwrap_or_default();
            timestamp = parse_timestamp(date, time);
            if timestamp.is_none() {
                if parse_timestamp(date, "0000").is_none() {
                    invalid.push(QSO_DATE.to_string());
                }
                if parse_timestamp("20000101", time).is_none() {
                    invalid.push(TIME_ON.to_string());
                }
            }
        }
        let Some(timestamp) = timestamp else {
            return Err(NormalizeError::Malformed(MalformedRecord {
                source: source.to_string(),
                record: raw,
                missing,
                invalid,
            }));
        };

        fields.retain(|_, v| !v.is_empty());
        self.split_submode(&mut fields);
        self.strip_power_units(&mut fields);

        let mut coercion_errors = Vec::new();
        let mut typed = BTreeMap::new();
        for (name, value) in fields {
            let kind = self.policy.kind(&name);
            match self.coerce(&name, kind, &value) {
                Some(v) => {
                    typed.insert(name, v);
                }
                None => {
                    trace!(field = %name, value = %value, "dropping uncoercible value");
                    coercion_errors.push(FieldCoercionError {
                        source_id: source.to_string(),
                        field: name,
                        value,
                        kind,
                    });
                }
            }
        }

        self.drop_unset(&mut typed);

        Ok(Normalized {
            record: NormalizedRecord {
                fields: typed,
                source: source.to_string(),
                seq,
                timestamp,
            },
            coercion_errors,
        })
    }

    fn split_submode(&self, fields: &mut BTreeMap<String, String>) {
        let Some(mode) = fields.get(MODE).map(|m| m.to_ascii_uppercase()) else {
            return;
        };
        if let Some(parent) = self.policy.mode_alias(&mode) {
            debug!(mode = %mode, parent, "mode is a sub-mode");
            fields.insert(MODE.to_string(), parent.to_string());
            fields.insert(SUBMODE.to_string(), mode);
        }
    }

    fn strip_power_units(&self, fields: &mut BTreeMap<String, String>) {
        let cfg = self.policy.config();
        for name in &cfg.power_fields {
            let Some(value) = fields.get(name) else {
                continue;
            };
            if cfg.power_sentinels.iter().any(|s| s.eq_ignore_ascii_case(value)) {
                fields.remove(name);
                continue;
            }
            let bare = self
                .policy
                .power_unit
                .captures(value)
                .map(|caps| caps[1].to_string());
            if let Some(bare) = bare {
                fields.insert(name.clone(), bare);
            }
        }
    }

    fn coerce(&self, name: &str, kind: FieldKind, value: &str) -> Option<FieldValue> {
        let cfg = self.policy.config();
        match kind {
            FieldKind::Text => Some(FieldValue::Text(self.canonical_text(name, value))),
            FieldKind::Integer => parse_truncated(value).map(FieldValue::Int),
            FieldKind::PositiveInteger => parse_truncated(value)
                .and_then(|v| u64::try_from(v).ok())
                .map(FieldValue::UInt),
            FieldKind::Zone => parse_truncated(value)
                .and_then(|v| u32::try_from(v).ok())
                .map(FieldValue::Zone),
            FieldKind::Number => {
                let mut v: f64 = value.parse().ok().filter(|v: &f64| v.is_finite())?;
                // One rescale only; a power still past the threshold is not plausible.
                if Policy::listed(&cfg.power_fields, name) && v > cfg.power_scale_threshold {
                    v /= cfg.power_scale_divisor;
                    if v > cfg.power_scale_threshold {
                        return None;
                    }
                }
                if Policy::listed(&cfg.frequency_fields, name) {
                    let scale = 10f64.powi(cfg.frequency_decimals);
                    return Some(FieldValue::Number((v * scale).round() / scale));
                }
                if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    Some(FieldValue::Int(v as i64))
                } else {
                    Some(FieldValue::Number(v))
                }
            }
        }
    }

    fn canonical_text(&self, name: &str, value: &str) -> String {
        let cfg = self.policy.config();
        if Policy::listed(&cfg.band_fields, name) {
            value.to_uppercase()
        } else if Policy::listed(&cfg.callsign_fields, name) {
            value.replace('_', "/").to_uppercase()
        } else if Policy::listed(&cfg.grid_fields, name) {
            let head: String = value.chars().take(4).collect();
            let tail: String = value.chars().skip(4).collect();
            format!("{}{}", head.to_uppercase(), tail.to_lowercase())
        } else {
            value.to_string()
        }
    }

    fn drop_unset(&self, fields: &mut BTreeMap<String, FieldValue>) {
        let cfg = self.policy.config();

        for name in &cfg.coordinate_fields {
            let unset = fields
                .get(name)
                .and_then(FieldValue::as_text)
                .and_then(|v| v.get(1..))
                .is_some_and(|rest| rest == cfg.unset_coordinate);
            if unset {
                fields.remove(name);
            }
        }

        for name in &cfg.drop_zero_fields {
            if Policy::listed(&cfg.zero_valid_fields, name) {
                continue;
            }
            if fields.get(name).is_some_and(FieldValue::is_zero) {
                fields.remove(name);
            }
        }

        if self.restates_reports(fields) {
            fields.remove(&cfg.report_comment_field);
        }

        for name in &cfg.no_value_fields {
            let empty = fields.get(name).is_some_and(|v| {
                let token: String = v
                    .to_string()
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
                    .to_uppercase();
                cfg.no_value_tokens.iter().any(|t| *t == token)
            });
            if empty {
                fields.remove(name);
            }
        }
    }

    fn restates_reports(&self, fields: &BTreeMap<String, FieldValue>) -> bool {
        let cfg = self.policy.config();
        let (Some(comment), Some(sent), Some(rcvd)) = (
            fields.get(&cfg.report_comment_field).and_then(FieldValue::as_text),
            fields.get("RST_SENT"),
            fields.get("RST_RCVD"),
        ) else {
            return false;
        };
        let Some(caps) = self.policy.report_comment.captures(comment) else {
            return false;
        };
        same_report(&caps[1], &sent.to_string()) && same_report(&caps[2], &rcvd.to_string())
    }
}

fn same_report(a: &str, b: &str) -> bool {
    match (a.parse::<i32>(), b.parse::<i32>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

fn parse_truncated(value: &str) -> Option<i64> {
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    let v: f64 = value.parse().ok()?;
    if v.is_finite() && v.abs() < i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}
