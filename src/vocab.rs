//! The flat vocabulary table: one row per (photo, word) pair that survives the quality filter.

use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::photo_table::PhotoRecord;
use crate::response::ImageQuality;

/// Minimum image quality a photo needs to contribute vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityCutoff {
    /// No filtering: low, medium and high photos all contribute.
    Low,
    #[default]
    Medium,
    High,
}

impl QualityCutoff {
    /// Whether a photo of quality `quality` passes this cutoff. `Unknown` never does.
    pub fn allows(self, quality: ImageQuality) -> bool {
        match self {
            Self::Low => matches!(
                quality,
                ImageQuality::Low | ImageQuality::Medium | ImageQuality::High
            ),
            Self::Medium => matches!(quality, ImageQuality::Medium | ImageQuality::High),
            Self::High => quality == ImageQuality::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// `"medium"` and `"high"` select their tier; any other name means no filtering.
impl FromStr for QualityCutoff {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Low,
        })
    }
}

impl fmt::Display for QualityCutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the model's word lists a vocabulary row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabSource {
    /// Read off the photo (OCR text confirmed by the model).
    Extracted,
    /// Proposed by the model from the scene.
    Suggested,
}

impl VocabSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::Suggested => "suggested",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabRecord {
    pub photo_id: usize,
    pub vocab_word: String,
    pub english_translation: String,
    pub source: VocabSource,
}

/// Flatten the word lists of every photo that passes `cutoff`.
///
/// Rows come out in photo order, extracted before suggested within a photo, then list order.
/// Each word list is paired positionally with its translations; when the two lengths differ
/// the unmatched tail of the longer list is dropped.
pub fn build_vocab_table(photos: &[PhotoRecord], cutoff: QualityCutoff) -> Vec<VocabRecord> {
    let mut out = Vec::new();

    for photo in photos
        .iter()
        .filter(|photo| cutoff.allows(photo.image_quality()))
    {
        let res = &photo.response;
        push_pairs(
            &mut out,
            photo.photo_id(),
            &res.extracted_words,
            &res.translated_extracted_words,
            VocabSource::Extracted,
        );
        push_pairs(
            &mut out,
            photo.photo_id(),
            &res.suggested_words,
            &res.translated_suggested_words,
            VocabSource::Suggested,
        );
    }

    out
}

fn push_pairs(
    out: &mut Vec<VocabRecord>,
    photo_id: usize,
    words: &[String],
    translations: &[String],
    source: VocabSource,
) {
    // zip stops at the shorter list.
    out.extend(
        words
            .iter()
            .zip(translations)
            .map(|(word, translation)| VocabRecord {
                photo_id,
                vocab_word: word.clone(),
                english_translation: translation.clone(),
                source,
            }),
    );
}

/// Keep the first row for each distinct word/translation pair.
///
/// Words compare trimmed and case-insensitively, translations trimmed. Kept rows are returned
/// unchanged and in their original order.
pub fn dedupe(records: &[VocabRecord]) -> Vec<VocabRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|rec| {
            seen.insert((
                rec.vocab_word.trim().to_lowercase(),
                rec.english_translation.trim().to_owned(),
            ))
        })
        .cloned()
        .collect()
}
