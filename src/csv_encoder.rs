use std::io::Write;

use serde::Serialize;

use crate::Result;
use crate::row_encoder::RowEncoder;

/// A `RowEncoder` that writes rows as CSV.
///
/// Design:
/// - The header row is derived from the first row's field names, so a table with no rows
///   produces an empty file.
/// - Row types must be flat: sequences and nested structs can't be represented in a cell.
pub struct CsvEncoder<W: Write> {
    /// The underlying CSV writer.
    w: csv::Writer<W>,

    /// Whether the encoder has been closed.
    closed: bool,
}

impl<W: Write> CsvEncoder<W> {
    /// Create a comma-separated encoder with a header row.
    pub fn new(w: W) -> Self {
        Self::with_writer(csv::Writer::from_writer(w))
    }

    /// Wrap a preconfigured `csv::Writer` (custom delimiter, no headers, ...).
    pub fn with_writer(w: csv::Writer<W>) -> Self {
        Self { w, closed: false }
    }
}

impl<W: Write, T: Serialize + ?Sized> RowEncoder<T> for CsvEncoder<W> {
    fn write_row(&mut self, row: &T) -> Result<()> {
        if self.closed {
            return Err(crate::Error::msg("cannot write row: encoder is already closed"));
        }

        self.w.serialize(row)?;
        Ok(())
    }

    /// Flush the underlying writer. This is idempotent.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.w.flush()?;
        self.closed = true;
        Ok(())
    }
}
