use std::error::Error as StdError;

use thiserror::Error;

/// photo-vocab's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// photo-vocab's crate-wide error type.
///
/// Bad model *content* never shows up here: malformed payloads degrade to fallback records.
/// These variants cover collaborator failures (OCR, backends, IO) and caller contract violations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    /// The backend kept rate-limiting us until the retry ceiling was reached.
    #[error("no capacity available after {attempts} attempts")]
    NoCapacity { attempts: u32 },

    /// A non-retryable backend failure (any non-success status other than 429).
    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// Parallel per-photo sequences did not line up.
    #[error(
        "per-photo inputs are misaligned: {images} images, {responses} responses, {ocr_texts} OCR texts, {metadata} metadata entries"
    )]
    LengthMismatch {
        images: usize,
        responses: usize,
        ocr_texts: usize,
        metadata: usize,
    },

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Whether this error is the distinct "ran out of retries" failure.
    pub fn is_no_capacity(&self) -> bool {
        matches!(self, Self::NoCapacity { .. })
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

#[cfg(feature = "backends")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
