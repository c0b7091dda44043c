use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::qso::{BAND, CALL, FieldValue, MODE, NormalizedRecord, QSO_DATE, SUBMODE, TIME_ON};

/// Records sharing this key are merge candidates; the merge window splits them further.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergeGroupKey {
    /// Contacted call sign.
    pub call: String,
    /// Band.
    pub band: String,
    /// Mode.
    pub mode: String,
    /// Sub-mode, if any.
    pub submode: Option<String>,
}

impl MergeGroupKey {
    /// Key of a normalized record.
    pub fn of(rec: &NormalizedRecord) -> Self {
        let part = |name: &str| rec.get(name).map(FieldValue::to_string);
        Self {
            call: part(CALL).unwrap_or_default(),
            band: part(BAND).unwrap_or_default(),
            mode: part(MODE).unwrap_or_default(),
            submode: part(SUBMODE),
        }
    }
}

/// Combines `YYYYMMDD` and `HHMM`/`HHMMSS` into one instant.
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if date.len() != 8 || !all_digits(date) || !all_digits(time) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(
        date[0..4].parse().ok()?,
        date[4..6].parse().ok()?,
        date[6..8].parse().ok()?,
    )?;
    let seconds = match time.len() {
        4 => 0,
        6 => time[4..6].parse().ok()?,
        _ => return None,
    };
    let time = NaiveTime::from_hms_opt(time[0..2].parse().ok()?, time[2..4].parse().ok()?, seconds)?;
    Some(date.and_time(time))
}

/// Start instant of a typed field map.
pub fn fields_timestamp(fields: &BTreeMap<String, FieldValue>) -> Option<NaiveDateTime> {
    let date = fields.get(QSO_DATE)?.to_string();
    let time = fields.get(TIME_ON)?.to_string();
    parse_timestamp(&date, &time)
}
