//! Structured records decoded from a vision model's free-text answer.
//!
//! Model output is unreliable: fields go missing, lists come back as strings, quality tiers
//! arrive in unexpected spellings. Decoding is therefore lenient per field. Only a payload that is not a
//! JSON object at all counts as a parse failure, and even that degrades to
//! [`ModelResponse::fallback`] instead of an error.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Explanation text stored on both explanation fields when a response cannot be parsed.
pub const PARSE_ERROR_EXPLANATION: &str = "Parsing error";

/// The model's own assessment of how legible a photo was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ImageQuality {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl ImageQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

/// Only the exact lowercase tier names are recognized. `"High"` or `" high"` is `Unknown`,
/// so such a photo never contributes vocabulary.
impl From<&str> for ImageQuality {
    fn from(value: &str) -> Self {
        match value {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for ImageQuality {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed model answer for one photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub extracted_words: Vec<String>,
    pub translated_extracted_words: Vec<String>,
    pub suggested_words: Vec<String>,
    pub translated_suggested_words: Vec<String>,
    pub image_quality: ImageQuality,
    pub relevance_explanation: String,
    pub quality_explanation: String,
    /// The complete raw response the record was decoded from.
    pub json_response: String,
}

impl ModelResponse {
    /// The record produced when `raw` could not be decoded.
    pub fn fallback(raw: &str) -> Self {
        Self {
            extracted_words: Vec::new(),
            translated_extracted_words: Vec::new(),
            suggested_words: Vec::new(),
            translated_suggested_words: Vec::new(),
            image_quality: ImageQuality::Unknown,
            relevance_explanation: PARSE_ERROR_EXPLANATION.to_owned(),
            quality_explanation: PARSE_ERROR_EXPLANATION.to_owned(),
            json_response: raw.to_owned(),
        }
    }

    /// Decode `payload` (the structured part of `raw`) into a record.
    ///
    /// Fails only when `payload` is not a single JSON object. `raw` is kept verbatim as
    /// provenance.
    pub fn from_payload(payload: &str, raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(payload)?;
        if !value.is_object() {
            return Err(serde_json::Error::custom(
                "expected the payload to be a JSON object",
            ));
        }

        let payload: Payload = serde_json::from_value(value)?;
        Ok(Self {
            extracted_words: payload.extracted_words,
            translated_extracted_words: payload.translated_extracted_words,
            suggested_words: payload.suggested_words,
            translated_suggested_words: payload.translated_suggested_words,
            image_quality: payload.image_quality,
            relevance_explanation: payload.relevance_explanation,
            quality_explanation: payload.quality_explanation,
            json_response: raw.to_owned(),
        })
    }
}

/// Wire shape of the JSON object the model is asked to emit.
#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default, deserialize_with = "word_list")]
    extracted_words: Vec<String>,
    #[serde(default, deserialize_with = "word_list")]
    translated_extracted_words: Vec<String>,
    #[serde(default, deserialize_with = "word_list")]
    suggested_words: Vec<String>,
    #[serde(default, deserialize_with = "word_list")]
    translated_suggested_words: Vec<String>,
    #[serde(default, deserialize_with = "quality")]
    image_quality: ImageQuality,
    #[serde(default, deserialize_with = "free_text")]
    relevance_explanation: String,
    #[serde(default, deserialize_with = "free_text")]
    quality_explanation: String,
}

/// Anything that is not an array becomes an empty list. Non-string elements are kept as their
/// JSON text so positional alignment with the translation list survives.
fn word_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(value_to_text).collect(),
        _ => Vec::new(),
    })
}

fn quality<'de, D>(deserializer: D) -> Result<ImageQuality, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => ImageQuality::from(s.as_str()),
        _ => ImageQuality::Unknown,
    })
}

fn free_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        other => value_to_text(other),
    })
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
