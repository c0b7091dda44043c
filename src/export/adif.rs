use std::io::Write;

use chrono::Utc;

use crate::qso::ResolvedRecord;

use super::{ExportResult, RecordWriter};

/// ADIF version written in the header.
pub const ADIF_VERSION: &str = "3.1.0";

/// Fields written first, in this order; WSJT-X writes the same set.
pub const FIELD_ORDER: &[&str] = &[
    "CALL",
    "GRIDSQUARE",
    "MODE",
    "SUBMODE",
    "RST_SENT",
    "RST_RCVD",
    "QSO_DATE",
    "TIME_ON",
    "QSO_DATE_OFF",
    "TIME_OFF",
    "BAND",
    "FREQ",
    "STATION_CALLSIGN",
    "MY_GRIDSQUARE",
    "TX_PWR",
    "COMMENT",
    "NAME",
];

/// Writes records as ADIF, one record per line.
pub struct AdifWriter<W: Write> {
    out: W,
    minimal: bool,
    header_written: bool,
}

impl<W: Write> AdifWriter<W> {
    /// Wraps `out`; the header goes out with the first batch.
    pub fn new(out: W) -> Self {
        Self {
            out,
            minimal: false,
            header_written: false,
        }
    }

    /// Only write the fields in [`FIELD_ORDER`].
    pub fn minimal(mut self, minimal: bool) -> Self {
        self.minimal = minimal;
        self
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_header(&mut self) -> ExportResult<()> {
        let created = Utc::now().format("%Y%m%d %H%M%S").to_string();
        write_field(&mut self.out, "adif_ver", ADIF_VERSION)?;
        write_field(&mut self.out, "created_timestamp", &created)?;
        write_field(&mut self.out, "programid", env!("CARGO_PKG_NAME"))?;
        write_field(&mut self.out, "programversion", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.out, "<eoh>")?;
        self.header_written = true;
        Ok(())
    }

    fn write_record(&mut self, rec: &ResolvedRecord) -> ExportResult<()> {
        for name in FIELD_ORDER {
            if let Some(value) = rec.get(name) {
                write_field(&mut self.out, name, &value.to_string())?;
            }
        }
        if !self.minimal {
            for (name, value) in rec.fields() {
                if name.starts_with('_') || FIELD_ORDER.contains(&name.as_str()) {
                    continue;
                }
                write_field(&mut self.out, name, &value.to_string())?;
            }
        }
        writeln!(self.out, "<eor>")?;
        Ok(())
    }
}

impl<W: Write> RecordWriter for AdifWriter<W> {
    fn write_records(&mut self, records: &[ResolvedRecord]) -> ExportResult<()> {
        if !self.header_written {
            self.write_header()?;
        }
        for rec in records {
            self.write_record(rec)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> ExportResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Writes `<name:len>value ` with a lower-case name and a character length.
pub fn write_field<W: Write>(out: &mut W, name: &str, value: &str) -> std::io::Result<()> {
    write!(
        out,
        "<{}:{}>{} ",
        name.to_lowercase(),
        value.chars().count(),
        value
    )
}
