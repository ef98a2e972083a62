use std::path::Path;

use crate::Result;

/// Pluggable vision-model backend used by [`crate::VocabPipeline`].
///
/// A backend receives the rendered prompt plus the photo and returns the model's raw,
/// free-text answer. It does not parse anything: turning the answer into a record is the
/// job of a [`crate::ResponseParser`].
///
/// Backends are expected to absorb transient rate limiting themselves (see
/// [`crate::retry::run_with_backoff`]) and to surface [`crate::Error::NoCapacity`] once they
/// give up.
pub trait VisionBackend {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Ask the model about one photo and return its raw answer.
    fn query(&self, prompt: &str, image_path: &Path) -> Result<String>;
}

impl<B: VisionBackend + ?Sized> VisionBackend for &B {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn query(&self, prompt: &str, image_path: &Path) -> Result<String> {
        (**self).query(prompt, image_path)
    }
}

impl<B: VisionBackend + ?Sized> VisionBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn query(&self, prompt: &str, image_path: &Path) -> Result<String> {
        (**self).query(prompt, image_path)
    }
}
