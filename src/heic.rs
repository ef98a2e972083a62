//! HEIC to JPEG conversion.
//!
//! Phones store photos as HEIC, which neither tesseract nor the vision backends read. The
//! converted JPEG feeds OCR and the model; EXIF is still read from the HEIC original.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::{Error, Result};

/// Writes a JPEG rendition of `src` to `dest`.
pub trait ImageConverter {
    fn convert(&self, src: &Path, dest: &Path) -> Result<()>;
}

impl<C: ImageConverter + ?Sized> ImageConverter for &C {
    fn convert(&self, src: &Path, dest: &Path) -> Result<()> {
        (**self).convert(src, dest)
    }
}

/// Runs libheif's `heif-convert` tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeifConvert {
    pub binary: PathBuf,

    /// JPEG quality, 0-100.
    pub quality: u8,
}

impl Default for HeifConvert {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("heif-convert"),
            quality: 90,
        }
    }
}

impl HeifConvert {
    fn command(&self, src: &Path, dest: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-q").arg(self.quality.to_string()).arg(src).arg(dest);
        cmd
    }
}

impl ImageConverter for HeifConvert {
    fn convert(&self, src: &Path, dest: &Path) -> Result<()> {
        let output = self.command(src, dest).output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                Error::msg("heif-convert not found (install libheif-examples)")
            }
            _ => Error::from(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::msg(format!(
                "heif-convert failed on '{}': {}",
                src.display(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn command_passes_quality_then_paths() {
        let cmd = HeifConvert::default()
            .command(Path::new("IMG_1.HEIC"), Path::new("jpg/IMG_1.jpg"));
        let args: Vec<&OsStr> = cmd.get_args().collect();

        assert_eq!(cmd.get_program(), "heif-convert");
        assert_eq!(args, vec!["-q", "90", "IMG_1.HEIC", "jpg/IMG_1.jpg"]);
    }

    #[test]
    fn missing_binary_reports_install_hint() {
        let converter = HeifConvert {
            binary: PathBuf::from("definitely-not-heif-convert"),
            ..HeifConvert::default()
        };

        let err = converter
            .convert(Path::new("IMG_1.HEIC"), Path::new("IMG_1.jpg"))
            .unwrap_err();
        assert!(err.to_string().contains("heif-convert not found"));
    }
}
