use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::heic::ImageConverter;
use crate::{Error, Result};

/// Extensions (lowercase) of photos the vision backends can ingest directly.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Extensions (lowercase) of photos that are converted to JPEG first.
pub const HEIC_EXTENSIONS: [&str; 2] = ["heic", "heif"];

/// Subdirectory of the input directory that receives converted JPEGs.
pub const CONVERTED_DIR: &str = "jpg";

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| exts.contains(&ext.to_ascii_lowercase().as_str()))
}

pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, &SUPPORTED_EXTENSIONS)
}

pub fn is_heic(path: &Path) -> bool {
    has_extension(path, &HEIC_EXTENSIONS)
}

/// Where the JPEG rendition of a HEIC photo goes: `<dir>/jpg/<stem>.jpg`.
pub fn converted_path(heic_path: &Path) -> PathBuf {
    let dir = heic_path.parent().unwrap_or_else(|| Path::new(""));
    let stem = heic_path.file_stem().unwrap_or_default();
    let mut name = stem.to_os_string();
    name.push(".jpg");
    dir.join(CONVERTED_DIR).join(name)
}

/// One photo as the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSource {
    /// The photo the user took; reported in the tables and read for EXIF.
    pub original: PathBuf,

    /// The file OCR and the vision model read. Equal to `original` unless it was converted.
    pub image_path: PathBuf,
}

impl PhotoSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            image_path: path.clone(),
            original: path,
        }
    }

    pub fn converted(original: impl Into<PathBuf>, image_path: impl Into<PathBuf>) -> Self {
        Self {
            original: original.into(),
            image_path: image_path.into(),
        }
    }

    /// Path EXIF metadata is read from.
    pub fn exif_path(&self) -> &Path {
        &self.original
    }
}

impl From<PathBuf> for PhotoSource {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for PhotoSource {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// List the photos directly inside `dir`, sorted by file name.
///
/// The sort fixes the processing order, and with it every photo's `photo_id`. HEIC photos
/// are listed too; run them through [`prepare_photos`]. Unsupported files are skipped with a
/// warning; subdirectories (including the `jpg/` conversion output) are ignored.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        Error::msg(format!("failed to read image directory '{}': {e}", dir.display()))
    })?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if is_supported_image(&path) || is_heic(&path) {
            images.push(path);
        } else {
            warn!(path = %path.display(), "skipping unsupported file");
        }
    }

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

/// Turn discovered paths into [`PhotoSource`]s, converting HEIC photos to JPEG.
///
/// A JPEG already present at the converted path is reused. A failed conversion stops the
/// batch.
pub fn prepare_photos<C>(paths: &[PathBuf], converter: &C) -> Result<Vec<PhotoSource>>
where
    C: ImageConverter + ?Sized,
{
    let mut converted = 0usize;
    let mut sources = Vec::with_capacity(paths.len());

    for path in paths {
        if !is_heic(path) {
            sources.push(PhotoSource::new(path.clone()));
            continue;
        }

        let dest = converted_path(path);
        if dest.is_file() {
            debug!(path = %dest.display(), "reusing converted photo");
        } else {
            if let Some(dir) = dest.parent() {
                fs::create_dir_all(dir).map_err(|e| {
                    Error::msg(format!("failed to create '{}': {e}", dir.display()))
                })?;
            }
            converter.convert(path, &dest)?;
            converted += 1;
        }
        sources.push(PhotoSource::converted(path.clone(), dest));
    }

    if converted > 0 {
        info!(converted, "converted HEIC photos to JPEG");
    }
    Ok(sources)
}
