//! On-disk capture store

use crate::naming::{file_name, korean_expression, parse_file_name};
use crate::GalleryError;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Reason recorded for captures requested by the parent
pub const MANUAL_CAPTURE_REASON: &str = "camera_request";

const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One stored capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedImage {
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub baby_name: String,
    pub expression: String,
    pub captured_at: Option<NaiveDateTime>,
}

impl SavedImage {
    fn from_path(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let parsed = parse_file_name(&file_name);
        Some(Self {
            file_name,
            path,
            baby_name: parsed.baby_name,
            expression: parsed.expression,
            captured_at: parsed.captured_at,
        })
    }

    /// `yyyy-MM-dd HH:mm`, or empty when the name has no timestamp
    pub fn display_timestamp(&self) -> String {
        self.captured_at
            .map(|t| t.format(DISPLAY_TIME_FORMAT).to_string())
            .unwrap_or_default()
    }

    fn captured(&self, format: &str) -> Option<String> {
        self.captured_at.map(|t| t.format(format).to_string())
    }
}

/// Gallery filter criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Case-insensitive baby name
    BabyName,
    /// Prefix of the display timestamp, e.g. `2024`
    Year,
    /// `yyyyMM`
    Month,
    /// `yyyyMMdd`
    Day,
    /// Korean expression name, e.g. `행복` or `캡쳐`
    Expression,
}

impl FromStr for FilterType {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baby_name" | "name" => Ok(FilterType::BabyName),
            "year" => Ok(FilterType::Year),
            "month" => Ok(FilterType::Month),
            "day" => Ok(FilterType::Day),
            "expression" => Ok(FilterType::Expression),
            other => Err(GalleryError::UnknownFilter(other.to_string())),
        }
    }
}

impl FilterType {
    pub fn matches(&self, image: &SavedImage, value: &str) -> bool {
        let value = value.trim();
        match self {
            FilterType::BabyName => image.baby_name.trim().to_lowercase() == value.to_lowercase(),
            FilterType::Year => {
                let ts = image.display_timestamp();
                !ts.is_empty() && ts.starts_with(value)
            }
            FilterType::Month => image.captured("%Y%m").as_deref() == Some(value),
            FilterType::Day => image.captured("%Y%m%d").as_deref() == Some(value),
            FilterType::Expression => {
                korean_expression(&image.expression).to_lowercase() == value.to_lowercase()
            }
        }
    }
}

/// Directory of capture JPEGs
#[derive(Debug, Clone)]
pub struct Gallery {
    dir: PathBuf,
}

impl Gallery {
    /// Open the gallery, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, GalleryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!("Gallery at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a JPEG taken now
    pub fn save_jpeg(
        &self,
        jpeg: &[u8],
        baby_name: &str,
        reason: &str,
    ) -> Result<PathBuf, GalleryError> {
        self.save_jpeg_at(jpeg, baby_name, reason, Local::now().naive_local())
    }

    pub fn save_jpeg_at(
        &self,
        jpeg: &[u8],
        baby_name: &str,
        reason: &str,
        captured_at: NaiveDateTime,
    ) -> Result<PathBuf, GalleryError> {
        let path = self.dir.join(file_name(baby_name, captured_at, reason));
        fs::write(&path, jpeg)?;
        debug!("Saved {} bytes to {}", jpeg.len(), path.display());
        Ok(path)
    }

    /// All captures, newest first
    pub fn list(&self) -> Result<Vec<SavedImage>, GalleryError> {
        let mut images = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_jpeg = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("jpg"));
            if !is_jpeg || !path.is_file() {
                continue;
            }
            match SavedImage::from_path(path) {
                Some(image) => images.push(image),
                None => warn!("Skipping capture with non UTF-8 name"),
            }
        }

        images.sort_by(|a, b| {
            b.captured_at
                .cmp(&a.captured_at)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(images)
    }

    /// Captures matching `filter`, newest first
    pub fn filter(&self, filter: FilterType, value: &str) -> Result<Vec<SavedImage>, GalleryError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|image| filter.matches(image, value))
            .collect())
    }

    /// Path of a capture inside the gallery; rejects anything but a bare file name
    fn entry_path(&self, name: &str) -> Result<PathBuf, GalleryError> {
        let is_plain_name = !name.is_empty()
            && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        if !is_plain_name {
            return Err(GalleryError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(name))
    }

    /// JPEG bytes of a capture, or `None` if it does not exist
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>, GalleryError> {
        match fs::read(self.entry_path(name)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a capture by file name. Returns false if it did not exist.
    pub fn delete(&self, name: &str) -> Result<bool, GalleryError> {
        match fs::remove_file(self.entry_path(name)?) {
            Ok(()) => {
                info!("Deleted {}", name);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn populated() -> (tempfile::TempDir, Gallery) {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::open(dir.path().join("BaMIA")).unwrap();
        gallery.save_jpeg_at(b"a", "BABY", "Happiness", at(1, 9)).unwrap();
        gallery.save_jpeg_at(b"b", "BABY", "Sadness", at(2, 9)).unwrap();
        gallery
            .save_jpeg_at(b"c", "Dana", MANUAL_CAPTURE_REASON, at(2, 10))
            .unwrap();
        (dir, gallery)
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, gallery) = populated();
        fs::write(gallery.dir().join("notes.txt"), "x").unwrap();

        let images = gallery.list().unwrap();
        let names: Vec<_> = images.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "BaMIA_Dana_20240502_100000_camera_request.jpg",
                "BaMIA_BABY_20240502_090000_sadness.jpg",
                "BaMIA_BABY_20240501_090000_happiness.jpg",
            ]
        );
        assert_eq!(images[0].display_timestamp(), "2024-05-02 10:00");
    }

    #[test]
    fn test_filters() {
        let (_dir, gallery) = populated();
        let count = |f: FilterType, v: &str| gallery.filter(f, v).unwrap().len();

        assert_eq!(count(FilterType::BabyName, "baby"), 2);
        assert_eq!(count(FilterType::Year, "2024"), 3);
        assert_eq!(count(FilterType::Year, "2023"), 0);
        assert_eq!(count(FilterType::Month, "202405"), 3);
        assert_eq!(count(FilterType::Day, "20240502"), 2);
        assert_eq!(count(FilterType::Expression, "행복"), 1);
        assert_eq!(count(FilterType::Expression, "캡쳐"), 1);
    }

    #[test]
    fn test_saved_image_json_omits_path() {
        let (_dir, gallery) = populated();
        let image = &gallery.list().unwrap()[0];
        let json = serde_json::to_value(image).unwrap();
        assert_eq!(json["baby_name"], "Dana");
        assert_eq!(json["expression"], "camera_request");
        assert!(json.get("path").is_none());
    }

    #[test]
    fn test_filter_type_parse() {
        assert_eq!("Month".parse::<FilterType>().unwrap(), FilterType::Month);
        assert!(matches!(
            "colour".parse::<FilterType>(),
            Err(GalleryError::UnknownFilter(_))
        ));
    }

    #[test]
    fn test_read() {
        let (_dir, gallery) = populated();
        let bytes = gallery.read("BaMIA_BABY_20240502_090000_sadness.jpg").unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"b"[..]));
        assert_eq!(gallery.read("BaMIA_missing.jpg").unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let (_dir, gallery) = populated();
        let name = "BaMIA_BABY_20240501_090000_happiness.jpg";
        assert!(gallery.delete(name).unwrap());
        assert!(!gallery.delete(name).unwrap());
        assert_eq!(gallery.list().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_rejects_paths() {
        let (_dir, gallery) = populated();
        assert!(matches!(
            gallery.delete("../secret.jpg"),
            Err(GalleryError::InvalidName(_))
        ));
        assert!(matches!(gallery.delete(""), Err(GalleryError::InvalidName(_))));
    }
}
