use std::io::Write;

use tracing::error;

use crate::qso::{FieldValue, ResolvedRecord};

use super::{ExportResult, RecordWriter};

/// Writes the comma separated `wsjtx.log` format.
pub struct WsjtxCsvWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WsjtxCsvWriter<W> {
    /// Wraps `out` in a header-less CSV writer.
    pub fn new(out: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(out);
        Self { writer }
    }

    fn row(rec: &ResolvedRecord) -> [String; 13] {
        let field = |name: &str| rec.get(name).map(FieldValue::to_string).unwrap_or_default();
        let mode = rec
            .get("SUBMODE")
            .or_else(|| rec.get("MODE"))
            .map(FieldValue::to_string)
            .unwrap_or_default();
        [
            format_date(&field("QSO_DATE")),
            format_time(&field("TIME_ON")),
            format_date(&field("QSO_DATE_OFF")),
            format_time(&field("TIME_OFF")),
            field("CALL"),
            field("GRIDSQUARE"),
            field("FREQ"),
            mode,
            field("RST_SENT"),
            field("RST_RCVD"),
            field("TX_PWR"),
            field("COMMENT"),
            field("NAME"),
        ]
    }
}

impl<W: Write> RecordWriter for WsjtxCsvWriter<W> {
    fn write_records(&mut self, records: &[ResolvedRecord]) -> ExportResult<()> {
        for rec in records {
            self.writer.write_record(Self::row(rec))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> ExportResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// `YYYYMMDD` to `YYYY-MM-DD`; empty stays empty.
pub fn format_date(native: &str) -> String {
    match (native.get(0..4), native.get(4..6), native.get(6..8)) {
        (Some(y), Some(m), Some(d)) => format!("{y}-{m}-{d}"),
        _ => String::new(),
    }
}

/// `HHMMSS` or `HHMM` to `HH:MM:SS`; empty stays empty.
pub fn format_time(native: &str) -> String {
    if native.is_empty() {
        return String::new();
    }
    let len = if native.is_ascii() { native.len() } else { 0 };
    match len {
        6 => format!("{}:{}:{}", &native[0..2], &native[2..4], &native[4..6]),
        4 => format!("{}:{}:00", &native[0..2], &native[2..4]),
        _ => {
            error!(time = native, "bad time field");
            "ERROR".to_string()
        }
    }
}
