//! Merge configuration: field tables, tolerances and source trust rules.
//!
//! [`MergeConfig`] is plain data that can be deserialized from JSON with any
//! subset of keys present. [`Policy`] is the compiled, immutable form shared by
//! the normalizer, the resolver and the merge engine.

use std::collections::BTreeMap;
use std::path::Path;

use hashbrown::HashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    types::{FieldClass, FieldKind},
};

/// Default merge window in seconds.
pub const DEFAULT_MERGE_WINDOW_SECS: u32 = 115;

const INTEGER_FIELDS: &[&str] = &["K_INDEX", "NR_BURSTS", "NR_PINGS", "SFI", "SRX", "STX"];
const POSITIVE_INTEGER_FIELDS: &[&str] = &[
    "DXCC",
    "FISTS",
    "FISTS_CC",
    "IOTA_ISLAND_ID",
    "MY_DXCC",
    "MY_FISTS",
    "MY_IOTA_ISLAND_ID",
    "TEN_TEN",
    "UKMSG",
];
const NUMBER_FIELDS: &[&str] = &[
    "AGE",
    "A_INDEX",
    "ANT_AZ",
    "ANT_EL",
    "DISTANCE",
    "FREQ",
    "FREQ_RX",
    "MAX_BURSTS",
    "RX_PWR",
    "TX_PWR",
];
const ZONE_FIELDS: &[&str] = &["CQZ", "ITUZ", "MY_CQ_ZONE", "MY_ITU_ZONE"];

const FREE_TEXT_FIELDS: &[&str] = &[
    "ADDRESS",
    "CNTY",
    "COMMENT",
    "COUNTRY",
    "EMAIL",
    "MY_CITY",
    "MY_CNTY",
    "MY_COUNTRY",
    "MY_NAME",
    "MY_RIG",
    "MY_STREET",
    "NAME",
    "NOTES",
    "QSLMSG",
    "QTH",
    "RIG",
];
const PRECISION_FIELDS: &[&str] = &["GRIDSQUARE", "MY_GRIDSQUARE", "TIME_OFF", "TIME_ON"];
const CONFIRMATION_FIELDS: &[&str] = &[
    "EQSL_QSL_RCVD",
    "EQSL_QSL_SENT",
    "LOTW_QSL_RCVD",
    "LOTW_QSL_SENT",
    "QSL_RCVD",
    "QSL_SENT",
];
const OMITTABLE_CODE_FIELDS: &[&str] = &[
    "A_INDEX",
    "CQZ",
    "DXCC",
    "ITUZ",
    "K_INDEX",
    "MY_CQ_ZONE",
    "MY_DXCC",
    "MY_ITU_ZONE",
    "SFI",
];
const ZERO_UNSET_NUMBERS: &[&str] = &["AGE", "DISTANCE", "FREQ", "FREQ_RX", "RX_PWR", "TX_PWR"];

// A number followed by a watt suffix anywhere in the value, e.g. "100W PEP" or "5 w".
const POWER_UNIT_PATTERN: &str = r"([0-9]+(?:\.[0-9]*)?)\s*[Ww]";

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Trusted data source whose duplicates overwrite matching fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOverride {
    /// Token searched for (case-insensitively) in the duplicate's source id.
    pub source: String,
    /// Field name pattern, anchored at the start of the name.
    pub fields: String,
}

impl SourceOverride {
    fn new(source: &str, fields: &str) -> Self {
        Self {
            source: source.to_string(),
            fields: fields.to_string(),
        }
    }
}

/// Every tunable of normalization and merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Same-key records starting less than this many seconds after the primary merge into it.
    pub merge_window_secs: u32,
    /// Distances closer than this are the same distance.
    pub distance_abs_tolerance: f64,
    /// Distances whose difference relative to the larger is below this are the same.
    pub distance_rel_tolerance: f64,
    /// Frequencies (MHz) closer than this are the same frequency.
    pub freq_tolerance: f64,
    /// Fields every record must carry.
    pub mandatory_fields: Vec<String>,
    /// Storage kind per field; unlisted fields are text.
    pub field_kinds: BTreeMap<String, FieldKind>,
    /// Merge class per field; unlisted fields are generic.
    pub field_classes: BTreeMap<String, FieldClass>,
    /// Number fields rounded to `frequency_decimals` places.
    pub frequency_fields: Vec<String>,
    /// Decimal places kept on frequency fields.
    pub frequency_decimals: i32,
    /// Band fields, upper-cased.
    pub band_fields: Vec<String>,
    /// Call sign fields, upper-cased with `_` restored to `/`.
    pub callsign_fields: Vec<String>,
    /// Maidenhead locator fields.
    pub grid_fields: Vec<String>,
    /// Latitude/longitude fields.
    pub coordinate_fields: Vec<String>,
    /// Coordinate text after the hemisphere letter meaning "never set".
    pub unset_coordinate: String,
    /// Sub-mode to parent mode, applied when a sub-mode is logged as the mode.
    pub mode_aliases: BTreeMap<String, String>,
    /// Transmit/receive power fields.
    pub power_fields: Vec<String>,
    /// Power values meaning "unknown" (case-insensitive).
    pub power_sentinels: Vec<String>,
    /// Power values above this carry a spurious unit multiplier.
    pub power_scale_threshold: f64,
    /// Divisor applied to power values above the threshold.
    pub power_scale_divisor: f64,
    /// Numeric fields dropped when zero.
    pub drop_zero_fields: Vec<String>,
    /// Fields where zero is a real code, exempt from `drop_zero_fields`.
    pub zero_valid_fields: Vec<String>,
    /// Free-text field checked for a restated signal report.
    pub report_comment_field: String,
    /// Case-insensitive pattern capturing sent and received reports from a comment.
    pub report_comment_pattern: String,
    /// Fields dropped when they spell out "no value".
    pub no_value_fields: Vec<String>,
    /// Tokens (separators removed, upper-case) meaning "no value".
    pub no_value_tokens: Vec<String>,
    /// QSL codes meaning not (yet) confirmed.
    pub qsl_pending_codes: Vec<String>,
    /// QSL codes meaning confirmed.
    pub qsl_confirmed_codes: Vec<String>,
    /// Default report written by non-digital loggers.
    pub legacy_report_pattern: String,
    /// Signed dB report of digital modes.
    pub digital_report_pattern: String,
    /// Trusted sources, checked in order.
    pub source_overrides: Vec<SourceOverride>,
    /// Leading character of internal field names the resolver never touches.
    pub internal_marker: char,
}

impl Default for MergeConfig {
    fn default() -> Self {
        let mut field_kinds = BTreeMap::new();
        for (list, kind) in [
            (INTEGER_FIELDS, FieldKind::Integer),
            (POSITIVE_INTEGER_FIELDS, FieldKind::PositiveInteger),
            (NUMBER_FIELDS, FieldKind::Number),
            (ZONE_FIELDS, FieldKind::Zone),
        ] {
            for name in list {
                field_kinds.insert(name.to_string(), kind);
            }
        }

        let mut field_classes = BTreeMap::new();
        for (list, class) in [
            (FREE_TEXT_FIELDS, FieldClass::FreeText),
            (PRECISION_FIELDS, FieldClass::Precision),
            (&["DISTANCE"][..], FieldClass::Distance),
            (&["FREQ", "FREQ_RX"][..], FieldClass::Frequency),
            (CONFIRMATION_FIELDS, FieldClass::Confirmation),
            (&["RST_RCVD", "RST_SENT"][..], FieldClass::SignalReport),
            (OMITTABLE_CODE_FIELDS, FieldClass::OmittableCode),
        ] {
            for name in list {
                field_classes.insert(name.to_string(), class);
            }
        }

        let mode_aliases = [
            ("FT4", "MFSK"),
            ("FST4", "MFSK"),
            ("FST4W", "MFSK"),
            ("JS8", "MFSK"),
            ("Q65", "MFSK"),
            ("PSK31", "PSK"),
            ("PSK63", "PSK"),
            ("PSK125", "PSK"),
            ("QPSK31", "PSK"),
            ("USB", "SSB"),
            ("LSB", "SSB"),
        ]
        .into_iter()
        .map(|(sub, mode)| (sub.to_string(), mode.to_string()))
        .collect();

        let mut drop_zero_fields = names(OMITTABLE_CODE_FIELDS);
        drop_zero_fields.extend(names(ZERO_UNSET_NUMBERS));

        Self {
            merge_window_secs: DEFAULT_MERGE_WINDOW_SECS,
            distance_abs_tolerance: 5.0,
            distance_rel_tolerance: 0.02,
            freq_tolerance: 0.002,
            mandatory_fields: names(&["CALL", "QSO_DATE", "TIME_ON", "BAND", "MODE"]),
            field_kinds,
            field_classes,
            frequency_fields: names(&["FREQ", "FREQ_RX"]),
            frequency_decimals: 3,
            band_fields: names(&["BAND", "BAND_RX"]),
            callsign_fields: names(&[
                "CALL",
                "CONTACTED_OP",
                "EQ_CALL",
                "OPERATOR",
                "OWNER_CALLSIGN",
                "STATION_CALLSIGN",
            ]),
            grid_fields: names(&["GRIDSQUARE", "MY_GRIDSQUARE"]),
            coordinate_fields: names(&["LAT", "LON", "MY_LAT", "MY_LON"]),
            unset_coordinate: "000 00.000".to_string(),
            mode_aliases,
            power_fields: names(&["RX_PWR", "TX_PWR"]),
            power_sentinels: names(&["NAN"]),
            power_scale_threshold: 10_000.0,
            power_scale_divisor: 10_000.0,
            drop_zero_fields,
            zero_valid_fields: names(&["DXCC"]),
            report_comment_field: "COMMENT".to_string(),
            report_comment_pattern:
                r"^(?:[A-Z0-9]+\s+)?SENT:?\s*([+-]?\d+)\s+RCVD:?\s*([+-]?\d+)$".to_string(),
            no_value_fields: names(&["CONTEST_ID"]),
            no_value_tokens: names(&["NA", "NONCONTEST", "NONE"]),
            qsl_pending_codes: names(&["I", "N", "Q", "R"]),
            qsl_confirmed_codes: names(&["V", "Y"]),
            legacy_report_pattern: r"^\d{3}$".to_string(),
            digital_report_pattern: r"^[+-]\d{2}$".to_string(),
            source_overrides: vec![
                SourceOverride::new("LOTW", r"APP_LOTW_|LOTW_|ARRL_SECT|DXCC$|COUNTRY$"),
                SourceOverride::new("QRZ", r"APP_QRZCOM_|QRZCOM_"),
                SourceOverride::new("EQSL", r"APP_EQSL_|EQSL"),
                SourceOverride::new("CLUBLOG", r"APP_CLUBLOG_|CLUBLOG_"),
                SourceOverride::new("HRDLOG", r"APP_HRDLOG_|HRDLOG_"),
            ],
            internal_marker: '_',
        }
    }
}

impl MergeConfig {
    /// Loads a configuration from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug)]
struct CompiledOverride {
    source: String,
    fields: Regex,
}

/// Compiled, immutable form of a [`MergeConfig`].
#[derive(Debug)]
pub struct Policy {
    config: MergeConfig,
    kinds: HashMap<String, FieldKind>,
    classes: HashMap<String, FieldClass>,
    overrides: Vec<CompiledOverride>,
    pub(crate) report_comment: Regex,
    pub(crate) legacy_report: Regex,
    pub(crate) digital_report: Regex,
    pub(crate) power_unit: Regex,
}

impl Policy {
    /// Compiles every pattern and indexes the field tables.
    pub fn compile(config: MergeConfig) -> Result<Self, ConfigError> {
        let overrides = config
            .source_overrides
            .iter()
            .map(|o| {
                Ok(CompiledOverride {
                    source: o.source.to_uppercase(),
                    fields: compile_pattern(&format!("source_overrides.{}", o.source), &format!("^(?:{})", o.fields))?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            kinds: config.field_kinds.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            classes: config.field_classes.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            overrides,
            report_comment: compile_pattern(
                "report_comment_pattern",
                &format!("(?i){}", config.report_comment_pattern),
            )?,
            legacy_report: compile_pattern("legacy_report_pattern", &config.legacy_report_pattern)?,
            digital_report: compile_pattern("digital_report_pattern", &config.digital_report_pattern)?,
            power_unit: compile_pattern("power_unit", POWER_UNIT_PATTERN)?,
            config,
        })
    }

    /// The configuration this policy was compiled from.
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Storage kind of `field`.
    pub fn kind(&self, field: &str) -> FieldKind {
        self.kinds.get(field).copied().unwrap_or(FieldKind::Text)
    }

    /// Merge class of `field`.
    pub fn class(&self, field: &str) -> FieldClass {
        self.classes.get(field).copied().unwrap_or(FieldClass::Generic)
    }

    /// True for internal metadata names.
    pub fn is_internal(&self, field: &str) -> bool {
        field.starts_with(self.config.internal_marker)
    }

    /// Merge window as a duration.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.config.merge_window_secs))
    }

    /// Parent mode when `mode` is really a sub-mode.
    pub fn mode_alias(&self, mode: &str) -> Option<&str> {
        self.config.mode_aliases.get(mode).map(String::as_str)
    }

    /// Name of the first trusted source that claims `field` for a duplicate from `source_id`.
    pub fn override_source(&self, source_id: &str, field: &str) -> Option<&str> {
        let source_id = source_id.to_uppercase();
        self.overrides
            .iter()
            .find(|o| source_id.contains(&o.source) && o.fields.is_match(field))
            .map(|o| o.source.as_str())
    }

    pub(crate) fn listed(list: &[String], field: &str) -> bool {
        list.iter().any(|f| f == field)
    }

    pub(crate) fn is_pending_qsl(&self, code: &str) -> bool {
        self.config
            .qsl_pending_codes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(code))
    }

    pub(crate) fn is_confirmed_qsl(&self, code: &str) -> bool {
        self.config
            .qsl_confirmed_codes
            .iter()
            .any(|c| c.eq_ignore_ascii_case(code))
    }
}

fn compile_pattern(name: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        name: name.to_string(),
        source,
    })
}
