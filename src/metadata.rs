//! Image-capture metadata: raw EXIF tags and the renamed metadata table row.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Raw EXIF tags keyed by their `"<IFD> <Tag>"` names (e.g. `"GPS GPSLatitude"`).
pub type ExifTags = BTreeMap<String, String>;

/// Raw tag names the metadata table reads, in column order.
///
/// The latitude reference also appears with a leading space in older exports; both spellings
/// are accepted on lookup.
pub const RAW_EXIF_KEYS: [&str; 11] = [
    "Image DateTime",
    "GPS GPSLatitudeRef",
    "GPS GPSLatitude",
    "GPS GPSLongitudeRef",
    "GPS GPSLongitude",
    "GPS GPSAltitudeRef",
    "GPS GPSAltitude",
    "GPS GPSTimeStamp",
    "GPS GPSSpeedRef",
    "GPS GPSSpeed",
    "GPS GPSDate",
];

/// One row of the metadata table: the renamed EXIF fields for one photo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub photo_id: usize,
    pub image_path: String,
    pub image_datetime: Option<String>,
    pub latitude_ref: Option<String>,
    pub latitude: Option<String>,
    pub longitude_ref: Option<String>,
    pub longitude: Option<String>,
    pub altitude_ref: Option<String>,
    pub altitude: Option<String>,
    pub timestamp: Option<String>,
    pub speed_ref: Option<String>,
    pub speed: Option<String>,
    pub date: Option<String>,
}

impl MetadataRow {
    pub fn from_exif(photo_id: usize, image_path: impl Into<String>, tags: &ExifTags) -> Self {
        Self {
            photo_id,
            image_path: image_path.into(),
            image_datetime: tag(tags, &["Image DateTime"]),
            latitude_ref: tag(tags, &["GPS GPSLatitudeRef", " GPS GPSLatitudeRef"]),
            latitude: tag(tags, &["GPS GPSLatitude"]),
            longitude_ref: tag(tags, &["GPS GPSLongitudeRef"]),
            longitude: tag(tags, &["GPS GPSLongitude"]),
            altitude_ref: tag(tags, &["GPS GPSAltitudeRef"]),
            altitude: tag(tags, &["GPS GPSAltitude"]),
            timestamp: tag(tags, &["GPS GPSTimeStamp"]),
            speed_ref: tag(tags, &["GPS GPSSpeedRef"]),
            speed: tag(tags, &["GPS GPSSpeed"]),
            date: tag(tags, &["GPS GPSDate"]),
        }
    }
}

fn tag(tags: &ExifTags, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| tags.get(*name).cloned())
}

/// Reads the raw EXIF tags of a photo.
pub trait MetadataReader {
    fn read_tags(&self, image_path: &Path) -> Result<ExifTags>;
}

impl<M: MetadataReader + ?Sized> MetadataReader for &M {
    fn read_tags(&self, image_path: &Path) -> Result<ExifTags> {
        (**self).read_tags(image_path)
    }
}

impl<M: MetadataReader + ?Sized> MetadataReader for Box<M> {
    fn read_tags(&self, image_path: &Path) -> Result<ExifTags> {
        (**self).read_tags(image_path)
    }
}

/// A reader for runs that don't care about capture metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataReader for NoMetadata {
    fn read_tags(&self, _image_path: &Path) -> Result<ExifTags> {
        Ok(ExifTags::new())
    }
}

/// exiftool `-G1` names and the raw tag names they map onto.
const EXIFTOOL_TAGS: [(&str, &str); 11] = [
    ("IFD0:ModifyDate", "Image DateTime"),
    ("GPS:GPSLatitudeRef", "GPS GPSLatitudeRef"),
    ("GPS:GPSLatitude", "GPS GPSLatitude"),
    ("GPS:GPSLongitudeRef", "GPS GPSLongitudeRef"),
    ("GPS:GPSLongitude", "GPS GPSLongitude"),
    ("GPS:GPSAltitudeRef", "GPS GPSAltitudeRef"),
    ("GPS:GPSAltitude", "GPS GPSAltitude"),
    ("GPS:GPSTimeStamp", "GPS GPSTimeStamp"),
    ("GPS:GPSSpeedRef", "GPS GPSSpeedRef"),
    ("GPS:GPSSpeed", "GPS GPSSpeed"),
    ("GPS:GPSDateStamp", "GPS GPSDate"),
];

/// Reads EXIF tags by running the `exiftool` binary.
#[derive(Debug, Clone)]
pub struct ExifToolReader {
    binary: PathBuf,
}

impl ExifToolReader {
    pub fn new() -> Self {
        Self::with_binary("exiftool")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for ExifToolReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataReader for ExifToolReader {
    fn read_tags(&self, image_path: &Path) -> Result<ExifTags> {
        let output = Command::new(&self.binary)
            .args(["-j", "-G1"])
            .arg(image_path)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    Error::msg("exiftool not found (install libimage-exiftool-perl)")
                }
                _ => Error::from(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::msg(format!(
                "exiftool failed on '{}': {}",
                image_path.display(),
                stderr.trim()
            )));
        }

        let entries: Vec<Map<String, Value>> = serde_json::from_slice(&output.stdout)?;
        Ok(entries
            .first()
            .map(exiftool_to_raw_tags)
            .unwrap_or_default())
    }
}

/// Map one exiftool JSON object onto raw tag names. Tags exiftool didn't report are absent.
pub fn exiftool_to_raw_tags(entry: &Map<String, Value>) -> ExifTags {
    EXIFTOOL_TAGS
        .iter()
        .filter_map(|(exiftool_name, raw_name)| {
            let value = match entry.get(*exiftool_name)? {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            Some(((*raw_name).to_owned(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_exif_renames_known_tags() {
        let tags: ExifTags = [
            ("Image DateTime", "2024:05:01 12:30:00"),
            ("GPS GPSLatitudeRef", "N"),
            ("GPS GPSLatitude", "[52, 31, 12]"),
            ("GPS GPSDate", "2024:05:01"),
            ("EXIF FNumber", "1.8"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let row = MetadataRow::from_exif(3, "photos/sign.jpg", &tags);
        assert_eq!(row.photo_id, 3);
        assert_eq!(row.image_path, "photos/sign.jpg");
        assert_eq!(row.image_datetime.as_deref(), Some("2024:05:01 12:30:00"));
        assert_eq!(row.latitude_ref.as_deref(), Some("N"));
        assert_eq!(row.latitude.as_deref(), Some("[52, 31, 12]"));
        assert_eq!(row.date.as_deref(), Some("2024:05:01"));
        assert_eq!(row.longitude, None);
        assert_eq!(row.speed, None);
    }

    #[test]
    fn leading_space_latitude_ref_is_accepted() {
        let mut tags = ExifTags::new();
        tags.insert(" GPS GPSLatitudeRef".to_owned(), "S".to_owned());
        let row = MetadataRow::from_exif(0, "a.jpg", &tags);
        assert_eq!(row.latitude_ref.as_deref(), Some("S"));
    }

    #[test]
    fn exiftool_output_maps_to_raw_names() -> anyhow::Result<()> {
        let entry: Map<String, Value> = serde_json::from_str(
            r#"{
                "SourceFile": "a.jpg",
                "IFD0:ModifyDate": "2024:05:01 12:30:00",
                "GPS:GPSAltitude": 34.5,
                "GPS:GPSDateStamp": "2024:05:01",
                "GPS:GPSSpeed": null
            }"#,
        )?;

        let tags = exiftool_to_raw_tags(&entry);
        assert_eq!(tags.len(), 3);
        assert_eq!(tags["Image DateTime"], "2024:05:01 12:30:00");
        assert_eq!(tags["GPS GPSAltitude"], "34.5");
        assert_eq!(tags["GPS GPSDate"], "2024:05:01");
        Ok(())
    }

    #[test]
    fn every_exiftool_mapping_targets_a_known_raw_key() {
        for (_, raw) in EXIFTOOL_TAGS {
            assert!(RAW_EXIF_KEYS.contains(&raw), "{raw} is not a raw key");
        }
    }

    #[test]
    fn missing_exiftool_binary_reports_install_hint() {
        let reader = ExifToolReader::with_binary("definitely-not-exiftool-binary");
        let err = reader.read_tags(Path::new("a.jpg")).unwrap_err();
        assert!(err.to_string().contains("exiftool not found"));
    }
}
