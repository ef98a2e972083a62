//! Flashcard export as a self-contained Anki package (`.apkg`).
//!
//! The package carries its own two-field note model (`VocabWord` / `EnglishTranslation`) and a
//! single card template, so it imports into any Anki profile without preparing a notetype.

use std::path::Path;

use genanki_rs::{Deck, Field, Model, Note, Template};
use uuid::Uuid;

use crate::vocab::VocabRecord;
use crate::{Error, Result};

pub const DEFAULT_DECK_NAME: &str = "German Vocabulary";

/// Anki identifies models and decks by id; fixed ids let re-imports land in the same deck.
pub const DEFAULT_MODEL_ID: i64 = 1_234_567_890;
pub const DEFAULT_DECK_ID: i64 = 9_876_543_210;

const MODEL_NAME: &str = "Simple Model";
const FRONT_FIELD: &str = "VocabWord";
const BACK_FIELD: &str = "EnglishTranslation";

/// Settings for one exported deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckExporter {
    pub deck_name: String,
    pub deck_id: i64,
    pub model_id: i64,
}

impl Default for DeckExporter {
    fn default() -> Self {
        Self {
            deck_name: DEFAULT_DECK_NAME.to_owned(),
            deck_id: DEFAULT_DECK_ID,
            model_id: DEFAULT_MODEL_ID,
        }
    }
}

/// One note as it goes into the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card<'a> {
    pub guid: String,
    pub front: &'a str,
    pub back: &'a str,
    pub tags: [String; 2],
}

impl<'a> From<&'a VocabRecord> for Card<'a> {
    fn from(rec: &'a VocabRecord) -> Self {
        Self {
            guid: note_guid(rec),
            front: &rec.vocab_word,
            back: &rec.english_translation,
            // Anki tags can't contain spaces.
            tags: [format!("photo_{}", rec.photo_id), rec.source.as_str().to_owned()],
        }
    }
}

impl DeckExporter {
    /// One card per record, in record order.
    pub fn cards<'a>(&self, records: &'a [VocabRecord]) -> Vec<Card<'a>> {
        records.iter().map(Card::from).collect()
    }

    fn model(&self) -> Model {
        Model::new(
            self.model_id,
            MODEL_NAME,
            vec![Field::new(FRONT_FIELD), Field::new(BACK_FIELD)],
            vec![
                Template::new("Card 1")
                    .qfmt("{{VocabWord}}")
                    .afmt(r#"{{FrontSide}}<hr id="answer">{{EnglishTranslation}}"#),
            ],
        )
    }

    /// Assemble the deck in memory.
    pub fn build_deck(&self, records: &[VocabRecord]) -> Result<Deck> {
        let model = self.model();
        let mut deck = Deck::new(self.deck_id, &self.deck_name, "");

        for card in self.cards(records) {
            let tags: Vec<&str> = card.tags.iter().map(String::as_str).collect();
            let note = Note::new_with_options(
                model.clone(),
                vec![card.front, card.back],
                None,
                Some(tags),
                Some(&card.guid),
            )
            .map_err(|e| Error::msg(format!("invalid flashcard '{}': {e}", card.front)))?;
            deck.add_note(note);
        }

        Ok(deck)
    }

    /// Write the `.apkg` package to `path`. Returns the number of notes written.
    pub fn write_package(&self, path: &Path, records: &[VocabRecord]) -> Result<usize> {
        let file = path
            .to_str()
            .ok_or_else(|| Error::msg(format!("deck path is not UTF-8: '{}'", path.display())))?;

        self.build_deck(records)?
            .write_to_file(file)
            .map_err(|e| Error::msg(format!("failed to write deck '{}': {e}", path.display())))?;

        Ok(records.len())
    }
}

/// Stable note id: the same word/translation pair always maps to the same note, so importing
/// a later run updates existing cards instead of duplicating them.
pub fn note_guid(rec: &VocabRecord) -> String {
    let key = format!("{}\u{1f}{}", rec.vocab_word, rec.english_translation);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
        .simple()
        .to_string()
}
