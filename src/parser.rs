//! Strategies for locating the structured payload inside a raw model response.
//!
//! Prompt wording and payload delimiting change together, so the delimiting rule lives behind
//! [`ResponseParser`]. Table building only ever sees the resulting [`ModelResponse`].

use tracing::{debug, warn};

use crate::response::ModelResponse;

/// Marker the default prompt asks the model to put in front of its JSON object.
pub const DEFAULT_MARKER: &str = "JSON_START:";

/// Turns one raw model response into a [`ModelResponse`].
///
/// Implementations must never fail: undecodable input yields [`ModelResponse::fallback`].
pub trait ResponseParser {
    /// Return the slice of `raw` that should hold the JSON payload.
    fn extract_payload<'a>(&self, raw: &'a str) -> &'a str;

    fn parse(&self, raw: &str) -> ModelResponse {
        let payload = self.extract_payload(raw);
        match ModelResponse::from_payload(payload, raw) {
            Ok(rec) => rec,
            Err(err) => {
                warn!(error = %err, raw_len = raw.len(), "unparseable model response, using fallback");
                ModelResponse::fallback(raw)
            }
        }
    }
}

/// Everything after the first occurrence of a marker literal is the payload.
///
/// Without a marker the whole response is tried, which usually fails on conversational
/// preambles and falls back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerParser {
    marker: String,
}

impl MarkerParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for MarkerParser {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl ResponseParser for MarkerParser {
    fn extract_payload<'a>(&self, raw: &'a str) -> &'a str {
        match raw.find(&self.marker) {
            Some(start) => &raw[start + self.marker.len()..],
            None => {
                debug!(marker = %self.marker, "marker not found, parsing whole response");
                raw
            }
        }
    }
}

/// Payload is the body of the first Markdown code fence (```` ```json ```` or bare ```` ``` ````).
///
/// Useful for models that ignore the marker instruction but still fence their JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FencedJsonParser;

impl ResponseParser for FencedJsonParser {
    fn extract_payload<'a>(&self, raw: &'a str) -> &'a str {
        const FENCE: &str = "```";

        let Some(open) = raw.find(FENCE) else {
            return raw;
        };
        let after_fence = &raw[open + FENCE.len()..];

        // Skip the info string (`json`, `JSON`, ...) up to the end of the fence line.
        let body_start = after_fence.find('\n').map_or(after_fence.len(), |i| i + 1);
        let body = &after_fence[body_start..];

        match body.find(FENCE) {
            Some(close) => &body[..close],
            None => body,
        }
    }
}

/// Parse `raw` with a [`MarkerParser`] for `marker`.
pub fn parse_response(raw: &str, marker: &str) -> ModelResponse {
    MarkerParser::new(marker).parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ImageQuality, PARSE_ERROR_EXPLANATION};

    const PAYLOAD: &str = r#"{"extracted_words": ["ausgang", "notausgang"], "translated_extracted_words": ["exit", "emergency exit"], "suggested_words": ["tür"], "translated_suggested_words": ["door"], "image_quality": "high", "relevance_explanation": "Signs near a door.", "quality_explanation": "Sharp text."}"#;

    #[test]
    fn marker_payload_is_decoded() {
        let raw = format!("Here is the result.\nJSON_START: {PAYLOAD}");
        let rec = parse_response(&raw, DEFAULT_MARKER);

        assert_eq!(rec.extracted_words, vec!["ausgang", "notausgang"]);
        assert_eq!(rec.translated_extracted_words, vec!["exit", "emergency exit"]);
        assert_eq!(rec.suggested_words, vec!["tür"]);
        assert_eq!(rec.translated_suggested_words, vec!["door"]);
        assert_eq!(rec.image_quality, ImageQuality::High);
        assert_eq!(rec.relevance_explanation, "Signs near a door.");
        assert_eq!(rec.quality_explanation, "Sharp text.");
        assert_eq!(rec.json_response, raw);
    }

    #[test]
    fn bare_json_without_marker_is_decoded() {
        let rec = parse_response(PAYLOAD, DEFAULT_MARKER);
        assert_eq!(rec.image_quality, ImageQuality::High);
        assert_eq!(rec.extracted_words.len(), 2);
    }

    #[test]
    fn conversational_response_without_marker_falls_back() {
        let raw = format!("Sure! Let me look at the image.\n{PAYLOAD}");
        let rec = parse_response(&raw, DEFAULT_MARKER);

        assert_eq!(rec, ModelResponse::fallback(&raw));
        assert_eq!(rec.quality_explanation, PARSE_ERROR_EXPLANATION);
    }

    #[test]
    fn marker_with_empty_or_truncated_payload_falls_back() {
        for raw in [
            "JSON_START:",
            "JSON_START:   ",
            r#"JSON_START: {"extracted_words": ["hund""#,
        ] {
            let rec = parse_response(raw, DEFAULT_MARKER);
            assert_eq!(rec.image_quality, ImageQuality::Unknown);
            assert_eq!(rec.json_response, raw);
        }
    }

    #[test]
    fn only_the_first_marker_counts() {
        let raw = format!("JSON_START: {PAYLOAD} JSON_START: {PAYLOAD}");
        let rec = parse_response(&raw, DEFAULT_MARKER);
        assert_eq!(rec.image_quality, ImageQuality::Unknown);
    }

    #[test]
    fn custom_marker_is_honoured() {
        let parser = MarkerParser::new("<<JSON>>");
        let raw = format!("blah <<JSON>>{PAYLOAD}");
        assert_eq!(parser.marker(), "<<JSON>>");
        assert_eq!(parser.parse(&raw).suggested_words, vec!["tür"]);
    }

    #[test]
    fn fenced_parser_reads_first_code_block() {
        let raw = format!("Result:\n```json\n{PAYLOAD}\n```\nAnything else?");
        let rec = FencedJsonParser.parse(&raw);
        assert_eq!(rec.image_quality, ImageQuality::High);
        assert_eq!(rec.json_response, raw);
    }

    #[test]
    fn fenced_parser_without_fence_tries_whole_response() {
        assert_eq!(FencedJsonParser.extract_payload("plain"), "plain");
        assert_eq!(FencedJsonParser.extract_payload("```json\n{}"), "{}");
    }
}
