//! High-level API for turning photos into vocabulary tables.
//!
//! We expose a single entry point (`VocabPipeline`) that wires together the collaborators for
//! one photo: OCR → prompt → vision model → EXIF. It collects one aligned [`PhotoInput`] per
//! photo. Everything after that ([`build`]) is pure table building and can be rerun offline on
//! saved inputs.
//!
//! Photos are processed strictly one at a time. A caller that wants to stop early simply
//! stops iterating; there is no partial-photo cancellation.

use std::path::Path;
use std::thread;

use tracing::{info, warn};

use crate::Result;
use crate::backend::VisionBackend;
use crate::images::PhotoSource;
use crate::metadata::{MetadataReader, MetadataRow};
use crate::ocr::OcrEngine;
use crate::opts::Opts;
use crate::parser::{MarkerParser, ResponseParser};
use crate::photo_table::{PhotoInput, PhotoRecord, PhotoTables, build_tables, join_on_photo_id};
use crate::prompt::PromptTemplate;
use crate::vocab::{QualityCutoff, VocabRecord, build_vocab_table};

/// Owns the collaborators needed to process photos.
///
/// Typical usage:
/// - Construct once with an OCR engine, a vision backend and a metadata reader.
/// - Call [`VocabPipeline::collect`] with the photos of a batch.
/// - Hand the inputs to [`build`].
pub struct VocabPipeline<O, B, M> {
    ocr: O,
    backend: B,
    metadata: M,
    prompt: PromptTemplate,
    opts: Opts,
}

impl<O, B, M> VocabPipeline<O, B, M>
where
    O: OcrEngine,
    B: VisionBackend,
    M: MetadataReader,
{
    pub fn new(ocr: O, backend: B, metadata: M, opts: Opts) -> Self {
        Self {
            ocr,
            backend,
            metadata,
            prompt: PromptTemplate::default(),
            opts,
        }
    }

    /// Replace the default prompt.
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A parser matching the marker this pipeline's prompt asks for.
    pub fn parser(&self) -> MarkerParser {
        self.opts.parser()
    }

    /// Run OCR, query the model and read EXIF for one photo.
    ///
    /// OCR and the model see `photo.image_path`; EXIF comes from the original. OCR and backend
    /// failures are fatal. Missing or unreadable EXIF only costs the metadata columns.
    pub fn process_photo(&self, photo: &PhotoSource) -> Result<PhotoInput> {
        let image_path = photo.image_path.as_path();
        let ocr_text = self.ocr.extract_text(image_path)?;
        let prompt = self
            .prompt
            .render(&ocr_text, &self.opts.language_level, &self.opts.marker);
        let raw_response = self.backend.query(&prompt, image_path)?;

        let exif_path = photo.exif_path();
        let exif = self.metadata.read_tags(exif_path).unwrap_or_else(|err| {
            warn!(path = %exif_path.display(), error = %err, "could not read EXIF metadata");
            Default::default()
        });

        Ok(PhotoInput {
            image_path: photo.original.display().to_string(),
            raw_response,
            ocr_text,
            exif,
        })
    }

    /// Process `photos` in order, pausing `opts.wait_between_photos` between queries.
    ///
    /// `on_photo` is called with each photo's index and original path before it is processed.
    pub fn collect(
        &self,
        photos: &[PhotoSource],
        mut on_photo: impl FnMut(usize, &Path),
    ) -> Result<Vec<PhotoInput>> {
        let mut inputs = Vec::with_capacity(photos.len());

        for (i, photo) in photos.iter().enumerate() {
            if i > 0 && !self.opts.wait_between_photos.is_zero() {
                thread::sleep(self.opts.wait_between_photos);
            }

            on_photo(i, &photo.original);
            info!(
                photo = i + 1,
                total = photos.len(),
                path = %photo.original.display(),
                backend = self.backend.name(),
                "processing photo"
            );

            inputs.push(self.process_photo(photo)?);
        }

        Ok(inputs)
    }
}

/// Every table derived from one batch of inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabTables {
    pub tables: PhotoTables,
    pub photos: Vec<PhotoRecord>,
    pub vocab: Vec<VocabRecord>,
}

impl VocabTables {
    pub fn metadata(&self) -> &[MetadataRow] {
        &self.tables.metadata
    }
}

/// Parse, join and flatten a batch of photo inputs.
pub fn build<P>(inputs: &[PhotoInput], parser: &P, cutoff: QualityCutoff) -> VocabTables
where
    P: ResponseParser + ?Sized,
{
    let tables = build_tables(inputs, parser);
    let photos = join_on_photo_id(&tables);
    let vocab = build_vocab_table(&photos, cutoff);

    info!(
        photos = photos.len(),
        vocab = vocab.len(),
        cutoff = %cutoff,
        "built vocabulary tables"
    );

    VocabTables {
        tables,
        photos,
        vocab,
    }
}

/// [`build`] with the marker and quality cutoff from `opts`.
pub fn build_with_opts(inputs: &[PhotoInput], opts: &Opts) -> VocabTables {
    build(inputs, &opts.parser(), opts.quality_cutoff)
}
