//! `photo_vocab` turns photos of German text into vocabulary tables and flashcard decks.
//!
//! This crate provides:
//! - Collaborators for one photo: HEIC conversion, OCR, a vision-model backend, EXIF metadata
//! - A lenient parser for the model's marker-delimited JSON answer
//! - Photo and vocabulary table building (pure, repeatable on saved inputs)
//! - Table encoders (CSV, JSON) and an Anki deck exporter
//!
//! Processing is strictly sequential: one photo, one OCR run, one model query at a time.

// High-level API (most consumers should start here).
pub mod opts;
pub mod pipeline;

// Response parsing and table building.
pub mod parser;
pub mod photo_table;
pub mod response;
pub mod vocab;

// Collaborators for one photo.
pub mod backend;
#[cfg(feature = "backends")]
pub mod backends;
pub mod heic;
pub mod images;
pub mod metadata;
pub mod ocr;
pub mod prompt;
pub mod retry;

// Output selection and encoder interfaces.
pub mod output_type;
pub mod row_encoder;

// Output encoders and exporters.
pub mod csv_encoder;
pub mod deck;
pub mod export;
pub mod json_array_encoder;

// Logging configuration.
#[cfg(feature = "logging")]
pub mod logging;

mod error;

pub use backend::VisionBackend;
pub use error::{Error, Result};
pub use images::PhotoSource;
pub use opts::Opts;
pub use output_type::OutputType;
pub use parser::{DEFAULT_MARKER, MarkerParser, ResponseParser, parse_response};
pub use photo_table::{PhotoInput, PhotoRecord};
pub use pipeline::{VocabPipeline, VocabTables, build, build_with_opts};
pub use response::{ImageQuality, ModelResponse};
pub use vocab::{QualityCutoff, VocabRecord, VocabSource, build_vocab_table};

#[cfg(feature = "logging")]
pub use logging::init as init_logging;
