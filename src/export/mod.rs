//! Output writers for merged records.

/// ADIF writer.
pub mod adif;
/// WSJT-X compatible CSV log writer.
pub mod wsjtx;

use crate::{error::ExportError, qso::ResolvedRecord};

/// Result of a writer operation.
pub type ExportResult<T> = Result<T, ExportError>;

/// Destination for merged records.
pub trait RecordWriter {
    /// Writes `records` in the given order.
    fn write_records(&mut self, records: &[ResolvedRecord]) -> ExportResult<()>;
    /// Flushes buffered output to the underlying stream.
    fn flush(&mut self) -> ExportResult<()> {
        Ok(())
    }
}
