//! The instruction sent to the vision model alongside each photo.

use crate::parser::DEFAULT_MARKER;

/// Default CEFR level the vocabulary is aimed at.
pub const DEFAULT_LANGUAGE_LEVEL: &str = "A1";

const DEFAULT_TEMPLATE: &str = r#"You are helping a learner build a German vocabulary study guide at the {language_level} level from a photo.

OCR output from the photo:
{ocr_output}

1. Clean up the OCR output: drop punctuation, digits, stray symbols and fragments that are not real words.
2. From what remains, extract the valid German words (lowercase, no duplicates, no English).
3. Look at the photo itself to confirm those words belong to the scene.
4. Suggest further German words and short phrases (nouns, verbs, adjectives, weather, relationships) that fit the scene and the {language_level} level, and check they are valid German.
5. Rate how legible the text in the photo was as "high", "medium" or "low".
6. In one sentence each, explain why the suggestions are relevant and why you chose the quality rating.
7. Translate every extracted and suggested entry into English, keeping the same order.

Answer with a JSON object with exactly these fields:
"extracted_words": [], "translated_extracted_words": [], "suggested_words": [], "translated_suggested_words": [],
"image_quality": "", "relevance_explanation": "", "quality_explanation": ""

Put the JSON object last in your answer and write {marker} immediately before it."#;

/// A prompt with `{ocr_output}`, `{language_level}` and `{marker}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Fill in the placeholders. The marker must match the parser's marker.
    pub fn render(&self, ocr_text: &str, language_level: &str, marker: &str) -> String {
        // Substitute the OCR text last so braces inside it are never treated as placeholders.
        self.template
            .replace("{language_level}", language_level)
            .replace("{marker}", marker)
            .replace("{ocr_output}", ocr_text.trim())
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

/// Render the default template with the default marker.
pub fn default_prompt(ocr_text: &str, language_level: &str) -> String {
    PromptTemplate::default().render(ocr_text, language_level, DEFAULT_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_fills_every_placeholder() {
        let prompt = default_prompt("  AUSGANG\nNOTAUSGANG  ", "A2");

        assert!(prompt.contains("AUSGANG\nNOTAUSGANG\n"));
        assert!(prompt.contains("at the A2 level"));
        assert!(prompt.contains("write JSON_START: immediately before it"));
        assert!(!prompt.contains("{ocr_output}"));
        assert!(!prompt.contains("{language_level}"));
        assert!(!prompt.contains("{marker}"));
    }

    #[test]
    fn ocr_text_with_placeholders_is_left_alone() {
        let template = PromptTemplate::new("[{ocr_output}] at {language_level}");
        assert_eq!(
            template.render("{language_level}", "B1", "M:"),
            "[{language_level}] at B1"
        );
    }

    #[test]
    fn every_payload_field_is_requested() {
        let template = PromptTemplate::default();
        for field in [
            "extracted_words",
            "translated_extracted_words",
            "suggested_words",
            "translated_suggested_words",
            "image_quality",
            "relevance_explanation",
            "quality_explanation",
        ] {
            assert!(template.as_str().contains(&format!("\"{field}\"")), "{field}");
        }
    }
}
