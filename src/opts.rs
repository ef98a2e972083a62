use std::time::Duration;

use crate::output_type::OutputType;
use crate::parser::{DEFAULT_MARKER, MarkerParser};
use crate::prompt::DEFAULT_LANGUAGE_LEVEL;
use crate::vocab::QualityCutoff;

/// Options that control one vocabulary run.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The CLI maps user input into this type so that:
/// - the library remains reusable outside of a CLI context
/// - other frontends (tests, batch jobs) can construct options programmatically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Literal the model is told to write before its JSON object, and the parser looks for.
    pub marker: String,

    /// Minimum photo quality that contributes vocabulary.
    pub quality_cutoff: QualityCutoff,

    /// CEFR level the prompt targets (e.g. `"A1"`).
    pub language_level: String,

    /// Pause between consecutive model queries.
    pub wait_between_photos: Duration,

    /// Format for exported tables.
    pub output_type: OutputType,

    /// Whether the exported deck drops repeated word/translation pairs.
    ///
    /// The vocabulary table itself is always exported in full.
    pub dedupe: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_owned(),
            quality_cutoff: QualityCutoff::default(),
            language_level: DEFAULT_LANGUAGE_LEVEL.to_owned(),
            wait_between_photos: Duration::from_secs(1),
            output_type: OutputType::default(),
            dedupe: false,
        }
    }
}

impl Opts {
    /// The response parser matching [`Opts::marker`].
    pub fn parser(&self) -> MarkerParser {
        MarkerParser::new(&self.marker)
    }
}
