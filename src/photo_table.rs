//! Per-photo tables: parsed model responses, capture metadata, and their join.
//!
//! `photo_id` is the 0-based position of a photo in processing order. Because every per-photo
//! input travels inside one [`PhotoInput`], the responses table and the metadata table always
//! agree on which id belongs to which photo.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::metadata::{ExifTags, MetadataRow};
use crate::parser::ResponseParser;
use crate::response::{ImageQuality, ModelResponse};
use crate::{Error, Result};

/// Everything collected for one photo before any parsing happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoInput {
    pub image_path: String,
    pub raw_response: String,
    pub ocr_text: String,
    #[serde(default)]
    pub exif: ExifTags,
}

impl PhotoInput {
    /// Zip parallel per-photo sequences into aligned inputs.
    ///
    /// Returns [`Error::LengthMismatch`] instead of silently dropping photos when the sequences
    /// disagree on how many photos there are.
    pub fn align(
        image_paths: Vec<String>,
        raw_responses: Vec<String>,
        ocr_texts: Vec<String>,
        exif: Vec<ExifTags>,
    ) -> Result<Vec<Self>> {
        let n = image_paths.len();
        if raw_responses.len() != n || ocr_texts.len() != n || exif.len() != n {
            return Err(Error::LengthMismatch {
                images: n,
                responses: raw_responses.len(),
                ocr_texts: ocr_texts.len(),
                metadata: exif.len(),
            });
        }

        Ok(image_paths
            .into_iter()
            .zip(raw_responses)
            .zip(ocr_texts)
            .zip(exif)
            .map(|(((image_path, raw_response), ocr_text), exif)| Self {
                image_path,
                raw_response,
                ocr_text,
                exif,
            })
            .collect())
    }
}

/// One row of the responses table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRow {
    pub photo_id: usize,
    pub ocr_text: String,
    pub response: ModelResponse,
}

/// The two per-photo tables, both indexed by `photo_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoTables {
    pub responses: Vec<ResponseRow>,
    pub metadata: Vec<MetadataRow>,
}

/// A photo's response row joined with its metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub metadata: MetadataRow,
    pub ocr_text: String,
    pub response: ModelResponse,
}

impl PhotoRecord {
    pub fn photo_id(&self) -> usize {
        self.metadata.photo_id
    }

    pub fn image_quality(&self) -> ImageQuality {
        self.response.image_quality
    }
}

/// Parse every response and rename every photo's EXIF tags.
pub fn build_tables<P>(inputs: &[PhotoInput], parser: &P) -> PhotoTables
where
    P: ResponseParser + ?Sized,
{
    let responses = inputs
        .iter()
        .enumerate()
        .map(|(photo_id, input)| ResponseRow {
            photo_id,
            ocr_text: input.ocr_text.clone(),
            response: parser.parse(&input.raw_response),
        })
        .collect();

    let metadata = inputs
        .iter()
        .enumerate()
        .map(|(photo_id, input)| MetadataRow::from_exif(photo_id, &input.image_path, &input.exif))
        .collect();

    PhotoTables {
        responses,
        metadata,
    }
}

/// Inner join on `photo_id`, in metadata-table order. Rows without a partner are dropped.
pub fn join_on_photo_id(tables: &PhotoTables) -> Vec<PhotoRecord> {
    let responses: HashMap<usize, &ResponseRow> = tables
        .responses
        .iter()
        .map(|row| (row.photo_id, row))
        .collect();

    tables
        .metadata
        .iter()
        .filter_map(|meta| {
            let row = responses.get(&meta.photo_id)?;
            Some(PhotoRecord {
                metadata: meta.clone(),
                ocr_text: row.ocr_text.clone(),
                response: row.response.clone(),
            })
        })
        .collect()
}

/// [`build_tables`] followed by [`join_on_photo_id`].
pub fn build_photo_table<P>(inputs: &[PhotoInput], parser: &P) -> Vec<PhotoRecord>
where
    P: ResponseParser + ?Sized,
{
    join_on_photo_id(&build_tables(inputs, parser))
}
