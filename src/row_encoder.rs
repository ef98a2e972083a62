use crate::Result;

/// A streaming writer for the rows of one table.
///
/// Encoders own the output framing (headers, brackets, separators). Callers must `close()` the
/// encoder once all rows are written; `close()` is idempotent and writes after it fail.
pub trait RowEncoder<T: ?Sized> {
    fn write_row(&mut self, row: &T) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Write every row of `rows`, then close the encoder.
pub fn write_all_rows<'a, T, E, I>(encoder: &mut E, rows: I) -> Result<()>
where
    T: 'a + ?Sized,
    E: RowEncoder<T> + ?Sized,
    I: IntoIterator<Item = &'a T>,
{
    for row in rows {
        encoder.write_row(row)?;
    }
    encoder.close()
}
