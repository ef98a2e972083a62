use std::io::Write;

use serde::Serialize;

use crate::row_encoder::RowEncoder;
use crate::{Error, Result};

/// A `RowEncoder` that streams rows into one JSON array, one row per line.
///
/// Rows are serialized straight into the writer, so a table is never held as one string.
/// The layout keeps exported tables diffable line by line:
///
/// ```json
/// [
/// {"photo_id":0,"vocab_word":"ausgang","english_translation":"exit","source":"extracted"},
/// {"photo_id":0,"vocab_word":"tür","english_translation":"door","source":"suggested"}
/// ]
/// ```
///
/// A table without rows is written as `[]`.
pub struct JsonArrayEncoder<W: Write> {
    w: W,
    rows: usize,
    closed: bool,
}

impl<W: Write> JsonArrayEncoder<W> {
    /// Nothing is written until the first row or [`RowEncoder::close`].
    pub fn new(w: W) -> Self {
        Self {
            w,
            rows: 0,
            closed: false,
        }
    }

    /// Rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl<W: Write, T: Serialize + ?Sized> RowEncoder<T> for JsonArrayEncoder<W> {
    fn write_row(&mut self, row: &T) -> Result<()> {
        if self.closed {
            return Err(Error::msg("cannot write row: encoder is already closed"));
        }

        let sep: &[u8] = if self.rows == 0 { b"[\n" } else { b",\n" };
        self.w.write_all(sep)?;
        serde_json::to_writer(&mut self.w, row)?;
        self.rows += 1;
        Ok(())
    }

    /// Close the array and flush. Closing twice is a no-op.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let tail: &[u8] = if self.rows == 0 { b"[]" } else { b"\n]" };
        self.w.write_all(tail)?;
        self.w.flush()?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{VocabRecord, VocabSource};

    fn rec(word: &str, translation: &str) -> VocabRecord {
        VocabRecord {
            photo_id: 0,
            vocab_word: word.to_string(),
            english_translation: translation.to_string(),
            source: VocabSource::Extracted,
        }
    }

    #[test]
    fn json_array_close_without_rows_emits_empty_array() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = JsonArrayEncoder::new(&mut out);
        RowEncoder::<VocabRecord>::close(&mut enc)?;
        assert_eq!(std::str::from_utf8(&out)?, "[]");
        Ok(())
    }

    #[test]
    fn json_array_writes_valid_json_incrementally() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = JsonArrayEncoder::new(&mut out);

        enc.write_row(&rec("hund", "dog"))?;
        enc.write_row(&rec("katze", "cat"))?;
        RowEncoder::<VocabRecord>::close(&mut enc)?;

        let s = std::str::from_utf8(&out)?;
        let parsed: serde_json::Value = serde_json::from_str(s)?;
        let arr = parsed.as_array().expect("expected JSON array");
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["vocab_word"], "hund");
        assert_eq!(arr[1]["english_translation"], "cat");
        assert_eq!(arr[1]["source"], "extracted");
        Ok(())
    }

    #[test]
    fn each_row_gets_its_own_line() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = JsonArrayEncoder::new(&mut out);

        enc.write_row(&rec("hund", "dog"))?;
        enc.write_row(&rec("katze", "cat"))?;
        assert_eq!(enc.rows(), 2);
        RowEncoder::<VocabRecord>::close(&mut enc)?;

        assert_eq!(
            std::str::from_utf8(&out)?,
            concat!(
                "[\n",
                r#"{"photo_id":0,"vocab_word":"hund","english_translation":"dog","source":"extracted"},"#,
                "\n",
                r#"{"photo_id":0,"vocab_word":"katze","english_translation":"cat","source":"extracted"}"#,
                "\n]"
            )
        );
        Ok(())
    }

    #[test]
    fn json_array_write_after_close_errors() -> anyhow::Result<()> {
        let mut out = Vec::new();
        let mut enc = JsonArrayEncoder::new(&mut out);
        RowEncoder::<VocabRecord>::close(&mut enc)?;
        RowEncoder::<VocabRecord>::close(&mut enc)?;
        let err = enc.write_row(&rec("nope", "no")).unwrap_err();
        assert!(err.to_string().contains("already closed"));
        assert_eq!(std::str::from_utf8(&out)?, "[]");
        Ok(())
    }
}
