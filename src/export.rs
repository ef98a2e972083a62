//! Writing a run's tables, raw inputs and deck to disk.
//!
//! Every file is written to `<name>.part` first and renamed into place once complete, so an
//! interrupted export never leaves a truncated table behind under its final name.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::csv_encoder::CsvEncoder;
use crate::deck::DeckExporter;
use crate::json_array_encoder::JsonArrayEncoder;
use crate::metadata::MetadataRow;
use crate::opts::Opts;
use crate::output_type::OutputType;
use crate::photo_table::{PhotoInput, PhotoRecord};
use crate::pipeline::VocabTables;
use crate::row_encoder::write_all_rows;
use crate::vocab::{VocabRecord, dedupe};
use crate::{Error, Result};

pub const PHOTO_TABLE: &str = "photo_table";
pub const METADATA_TABLE: &str = "metadata_table";
pub const VOCAB_TABLE: &str = "vocab_table";
pub const INPUTS_FILE: &str = "inputs.jsonl";
pub const DECK_FILE: &str = "german_vocabulary.apkg";

/// Create `<output_root>/results/<local timestamp>` and return its path.
pub fn create_run_dir(output_root: &Path) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let dir = output_root.join("results").join(stamp);
    fs::create_dir_all(&dir).map_err(|e| {
        Error::msg(format!("failed to create run directory '{}': {e}", dir.display()))
    })?;
    Ok(dir)
}

/// What one call to [`Exporter::write_tables`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub photos: usize,
    pub vocab_rows: usize,
    pub cards: usize,
    pub deck_path: PathBuf,
}

/// Writes the files of one run into a directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
    output_type: OutputType,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>, output_type: OutputType) -> Self {
        Self {
            dir: dir.into(),
            output_type,
        }
    }

    /// An exporter writing tables in `opts.output_type`.
    pub fn for_opts(dir: impl Into<PathBuf>, opts: &Opts) -> Self {
        Self::new(dir, opts.output_type)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.output_type.extension()))
    }

    /// Write the photo, metadata and vocabulary tables plus the deck.
    ///
    /// With `opts.dedupe` the deck keeps one card per word/translation pair; the vocabulary
    /// table is always written in full.
    pub fn write_tables(
        &self,
        tables: &VocabTables,
        deck: &DeckExporter,
        opts: &Opts,
    ) -> Result<ExportSummary> {
        self.write_photo_table(&tables.photos)?;
        self.write_metadata_table(tables.metadata())?;
        self.write_vocab_table(&tables.vocab)?;

        let deduped;
        let cards = if opts.dedupe {
            deduped = dedupe(&tables.vocab);
            &deduped
        } else {
            &tables.vocab
        };
        let deck_path = self.write_deck(deck, cards)?;

        Ok(ExportSummary {
            photos: tables.photos.len(),
            vocab_rows: tables.vocab.len(),
            cards: cards.len(),
            deck_path,
        })
    }

    /// The joined photo table, one flat row per photo.
    ///
    /// JSON keeps the word lists as arrays; CSV cells hold them JSON-encoded.
    pub fn write_photo_table(&self, photos: &[PhotoRecord]) -> Result<PathBuf> {
        let path = self.table_path(PHOTO_TABLE);
        match self.output_type {
            OutputType::Csv => {
                let rows = photos
                    .iter()
                    .map(|photo| PhotoRow::new(photo, |words| Ok(serde_json::to_string(words)?)))
                    .collect::<Result<Vec<_>>>()?;
                self.write_rows(&path, &rows)?;
            }
            OutputType::Json => {
                let rows = photos
                    .iter()
                    .map(|photo| PhotoRow::new(photo, |words| Ok(words)))
                    .collect::<Result<Vec<_>>>()?;
                self.write_rows(&path, &rows)?;
            }
        }
        Ok(path)
    }

    pub fn write_metadata_table(&self, rows: &[MetadataRow]) -> Result<PathBuf> {
        let path = self.table_path(METADATA_TABLE);
        self.write_rows(&path, rows)?;
        Ok(path)
    }

    pub fn write_vocab_table(&self, rows: &[VocabRecord]) -> Result<PathBuf> {
        let path = self.table_path(VOCAB_TABLE);
        self.write_rows(&path, rows)?;
        Ok(path)
    }

    /// One JSON object per line, for rebuilding the tables later without re-querying.
    pub fn write_inputs(&self, inputs: &[PhotoInput]) -> Result<PathBuf> {
        let path = self.dir.join(INPUTS_FILE);
        write_atomically(&path, |w| {
            for input in inputs {
                serde_json::to_writer(&mut *w, input)?;
                w.write_all(b"\n")?;
            }
            Ok(())
        })?;
        Ok(path)
    }

    /// The Anki package, one note per record.
    pub fn write_deck(&self, deck: &DeckExporter, records: &[VocabRecord]) -> Result<PathBuf> {
        let path = self.dir.join(DECK_FILE);
        let mut notes = 0;
        replace_atomically(&path, |tmp_path| {
            notes = deck.write_package(tmp_path, records)?;
            Ok(())
        })?;
        info!(path = %path.display(), notes, deck = %deck.deck_name, "wrote flashcard deck");
        Ok(path)
    }

    fn write_rows<T: Serialize>(&self, path: &Path, rows: &[T]) -> Result<()> {
        write_atomically(path, |w| match self.output_type {
            OutputType::Csv => write_all_rows(&mut CsvEncoder::new(w), rows),
            OutputType::Json => write_all_rows(&mut JsonArrayEncoder::new(w), rows),
        })?;
        info!(path = %path.display(), rows = rows.len(), "wrote table");
        Ok(())
    }
}

/// Read back an `inputs.jsonl` file. Blank lines are skipped.
pub fn read_inputs(path: &Path) -> Result<Vec<PhotoInput>> {
    let file = File::open(path)
        .map_err(|e| Error::msg(format!("failed to open '{}': {e}", path.display())))?;

    let mut inputs = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let input = serde_json::from_str(&line).map_err(|e| {
            Error::msg(format!("{}:{}: invalid photo input: {e}", path.display(), i + 1))
        })?;
        inputs.push(input);
    }
    Ok(inputs)
}

/// Write `dest_path` through a buffered writer, see [`replace_atomically`].
fn write_atomically(
    dest_path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<()>,
) -> Result<()> {
    replace_atomically(dest_path, |tmp_path| {
        let file = File::create(tmp_path).map_err(|e| {
            Error::msg(format!("failed to create temp file '{}': {e}", tmp_path.display()))
        })?;

        let mut w = BufWriter::new(file);
        write(&mut w)?;
        w.flush()?;
        w.get_ref().sync_all()?;
        Ok(())
    })
}

/// Produce `dest_path` safely:
/// - `write` fills `dest_path.part`
/// - rename to the final path
/// - remove the part file if anything fails
fn replace_atomically(dest_path: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    let tmp_path = PathBuf::from(format!("{}.part", dest_path.display()));

    let result = write(&tmp_path).and_then(|()| {
        fs::rename(&tmp_path, dest_path).map_err(|e| {
            Error::msg(format!("failed to move into place '{}': {e}", dest_path.display()))
        })
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}

/// Flat shape of a [`PhotoRecord`]: metadata columns, then response columns.
///
/// `L` is how the word lists are rendered: arrays in JSON, JSON-encoded strings in CSV.
#[derive(Debug, Serialize)]
struct PhotoRow<'a, L> {
    photo_id: usize,
    image_path: &'a str,
    image_datetime: Option<&'a str>,
    latitude_ref: Option<&'a str>,
    latitude: Option<&'a str>,
    longitude_ref: Option<&'a str>,
    longitude: Option<&'a str>,
    altitude_ref: Option<&'a str>,
    altitude: Option<&'a str>,
    timestamp: Option<&'a str>,
    speed_ref: Option<&'a str>,
    speed: Option<&'a str>,
    date: Option<&'a str>,
    json_response: &'a str,
    ocr_text: &'a str,
    extracted_words: L,
    translated_extracted_words: L,
    suggested_words: L,
    translated_suggested_words: L,
    image_quality: &'static str,
    relevance_explanation: &'a str,
    quality_explanation: &'a str,
}

impl<'a, L> PhotoRow<'a, L> {
    fn new(photo: &'a PhotoRecord, list: impl Fn(&'a [String]) -> Result<L>) -> Result<Self> {
        let meta = &photo.metadata;
        let res = &photo.response;
        Ok(Self {
            photo_id: meta.photo_id,
            image_path: &meta.image_path,
            image_datetime: meta.image_datetime.as_deref(),
            latitude_ref: meta.latitude_ref.as_deref(),
            latitude: meta.latitude.as_deref(),
            longitude_ref: meta.longitude_ref.as_deref(),
            longitude: meta.longitude.as_deref(),
            altitude_ref: meta.altitude_ref.as_deref(),
            altitude: meta.altitude.as_deref(),
            timestamp: meta.timestamp.as_deref(),
            speed_ref: meta.speed_ref.as_deref(),
            speed: meta.speed.as_deref(),
            date: meta.date.as_deref(),
            json_response: &res.json_response,
            ocr_text: &photo.ocr_text,
            extracted_words: list(&res.extracted_words)?,
            translated_extracted_words: list(&res.translated_extracted_words)?,
            suggested_words: list(&res.suggested_words)?,
            translated_suggested_words: list(&res.translated_suggested_words)?,
            image_quality: res.image_quality.as_str(),
            relevance_explanation: &res.relevance_explanation,
            quality_explanation: &res.quality_explanation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ExifTags;
    use crate::parser::MarkerParser;
    use crate::photo_table::build_photo_table;

    fn sample_inputs() -> Vec<PhotoInput> {
        vec![PhotoInput {
            image_path: "a.jpg".to_owned(),
            raw_response: r#"JSON_START: {"extracted_words": ["ausgang"], "translated_extracted_words": ["exit"], "image_quality": "high"}"#.to_owned(),
            ocr_text: "AUSGANG".to_owned(),
            exif: ExifTags::from([("GPS GPSLatitudeRef".to_owned(), "N".to_owned())]),
        }]
    }

    #[test]
    fn inputs_round_trip_through_jsonl() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let exporter = Exporter::new(dir.path(), OutputType::Csv);
        let inputs = sample_inputs();

        let path = exporter.write_inputs(&inputs)?;
        assert_eq!(read_inputs(&path)?, inputs);
        Ok(())
    }

    #[test]
    fn read_inputs_reports_the_bad_line() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(INPUTS_FILE);
        fs::write(&path, "\n{\"nope\": 1}\n")?;

        let err = read_inputs(&path).unwrap_err();
        assert!(err.to_string().contains(":2: invalid photo input"));
        Ok(())
    }

    #[test]
    fn photo_csv_encodes_lists_as_json() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let exporter = Exporter::new(dir.path(), OutputType::Csv);
        let photos = build_photo_table(&sample_inputs(), &MarkerParser::default());

        let path = exporter.write_photo_table(&photos)?;
        assert_eq!(path, dir.path().join("photo_table.csv"));

        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        let record = reader.records().next().expect("one row")?;
        let get = |name: &str| {
            let idx = headers.iter().position(|h| h == name).expect("column");
            record[idx].to_owned()
        };

        assert_eq!(get("photo_id"), "0");
        assert_eq!(get("latitude_ref"), "N");
        assert_eq!(get("latitude"), "");
        assert_eq!(get("extracted_words"), r#"["ausgang"]"#);
        assert_eq!(get("suggested_words"), "[]");
        assert_eq!(get("image_quality"), "high");
        assert_eq!(get("json_response"), sample_inputs()[0].raw_response);
        Ok(())
    }

    #[test]
    fn json_photo_table_has_the_same_flat_columns_as_csv() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let photos = build_photo_table(&sample_inputs(), &MarkerParser::default());

        let json_path = Exporter::new(dir.path(), OutputType::Json).write_photo_table(&photos)?;
        let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path)?)?;
        let row = parsed[0].as_object().expect("flat object");
        assert_eq!(row["photo_id"], 0);
        assert_eq!(row["latitude_ref"], "N");
        assert_eq!(row["extracted_words"][0], "ausgang");
        assert_eq!(row["image_quality"], "high");
        assert!(!row.contains_key("metadata"));
        assert!(!row.contains_key("response"));

        let csv_path = Exporter::new(dir.path(), OutputType::Csv).write_photo_table(&photos)?;
        let mut reader = csv::Reader::from_path(&csv_path)?;
        let csv_columns: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
        let mut json_columns: Vec<String> = row.keys().cloned().collect();
        let mut csv_columns = csv_columns;
        json_columns.sort();
        csv_columns.sort();
        assert_eq!(csv_columns, json_columns);
        Ok(())
    }

    #[test]
    fn write_tables_dedupes_only_the_deck() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut inputs = sample_inputs();
        inputs.push(inputs[0].clone());

        let opts = Opts {
            dedupe: true,
            output_type: OutputType::Json,
            ..Opts::default()
        };
        let tables = crate::pipeline::build_with_opts(&inputs, &opts);
        let summary = Exporter::for_opts(dir.path(), &opts).write_tables(
            &tables,
            &DeckExporter::default(),
            &opts,
        )?;

        assert_eq!(summary.photos, 2);
        assert_eq!(summary.vocab_rows, 2);
        assert_eq!(summary.cards, 1);
        assert_eq!(summary.deck_path, dir.path().join(DECK_FILE));
        assert!(dir.path().join("vocab_table.json").is_file());
        assert!(dir.path().join("photo_table.json").is_file());
        Ok(())
    }

    #[test]
    fn failed_writes_leave_no_files_behind() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest = dir.path().join("table.csv");

        let err = write_atomically(&dest, |w| {
            w.write_all(b"partial")?;
            Err(Error::msg("simulated failure"))
        })
        .unwrap_err();

        assert!(err.to_string().contains("simulated failure"));
        assert!(!dest.exists());
        assert!(!dir.path().join("table.csv.part").exists());
        Ok(())
    }

    #[test]
    fn run_dir_is_created_under_results() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let run = create_run_dir(dir.path())?;
        assert!(run.is_dir());
        assert_eq!(run.parent(), Some(dir.path().join("results").as_path()));
        Ok(())
    }
}
