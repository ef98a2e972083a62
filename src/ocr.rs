//! OCR collaborators.
//!
//! The OCR text is only a hint for the vision model, so engines return plain text and nothing
//! else.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::{Error, Result};

/// Extracts raw text from one image.
pub trait OcrEngine {
    fn extract_text(&self, image_path: &Path) -> Result<String>;
}

/// Tesseract settings. Everything tesseract needs is passed explicitly on its command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractConfig {
    /// Tesseract language code(s), e.g. `deu` or `deu+eng`.
    pub language: String,

    /// Directory holding `<language>.traineddata`; tesseract's own default when `None`.
    pub tessdata_dir: Option<PathBuf>,

    /// Binary to run.
    pub binary: PathBuf,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            language: "deu".to_owned(),
            tessdata_dir: None,
            binary: PathBuf::from("tesseract"),
        }
    }
}

/// Runs the `tesseract` command-line tool.
#[derive(Debug, Clone, Default)]
pub struct TesseractOcr {
    config: TesseractConfig,
}

impl TesseractOcr {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    fn command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg(image_path)
            .arg("stdout")
            .args(["-l", &self.config.language]);
        if let Some(dir) = &self.config.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd
    }
}

impl OcrEngine for TesseractOcr {
    fn extract_text(&self, image_path: &Path) -> Result<String> {
        let output = self.command(image_path).output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::msg("tesseract not found (install tesseract-ocr)")
            }
            _ => Error::from(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::msg(format!(
                "tesseract failed on '{}': {}",
                image_path.display(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    fn args(cmd: &Command) -> Vec<&OsStr> {
        cmd.get_args().collect()
    }

    #[test]
    fn command_uses_language_and_stdout() {
        let ocr = TesseractOcr::default();
        let cmd = ocr.command(Path::new("sign.jpg"));

        assert_eq!(cmd.get_program(), "tesseract");
        assert_eq!(args(&cmd), vec!["sign.jpg", "stdout", "-l", "deu"]);
    }

    #[test]
    fn tessdata_dir_is_passed_explicitly() {
        let ocr = TesseractOcr::new(TesseractConfig {
            language: "deu+eng".to_owned(),
            tessdata_dir: Some(PathBuf::from("tools")),
            ..TesseractConfig::default()
        });
        let cmd = ocr.command(Path::new("menu.png"));

        assert_eq!(
            args(&cmd),
            vec!["menu.png", "stdout", "-l", "deu+eng", "--tessdata-dir", "tools"]
        );
    }

    #[test]
    fn missing_binary_reports_install_hint() {
        let ocr = TesseractOcr::new(TesseractConfig {
            binary: PathBuf::from("definitely-not-tesseract-binary"),
            ..TesseractConfig::default()
        });

        let err = ocr.extract_text(Path::new("sign.jpg")).unwrap_err();
        assert!(err.to_string().contains("tesseract not found"));
    }
}
