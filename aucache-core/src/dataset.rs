// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::{Path, PathBuf};

use crate::constant;
use crate::error::AuError;
use crate::ut;

/// Names of the raw dataset directories and the video file template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub label_dir: String,
    pub video_dir: String,
    pub video_template: String,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            label_dir: constant::LABEL_DIR.to_string(),
            video_dir: constant::VIDEO_DIR.to_string(),
            video_template: constant::VIDEO_TEMPLATE.to_string(),
        }
    }
}

/// A read-only raw action unit dataset
///
/// Subjects are the sub-directories of the label directory. Each subject
/// has one label file per action unit and one video in the video directory.
///
/// # Examples
///
/// ```no_run
/// use aucache_core::dataset::{Dataset, DatasetLayout};
///
/// let dataset = Dataset::new("data/DISFA", DatasetLayout::default()).unwrap();
/// let persons = dataset.subjects().unwrap();
/// let cache = dataset.cache_dir(None);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
    layout: DatasetLayout,
}

impl Dataset {
    /// Initialize a dataset rooted at `root`
    ///
    /// # Arguments
    ///
    /// * `root` - Dataset root containing the label and video directories
    /// * `layout` - Directory names and video file template
    pub fn new<P: AsRef<Path>>(root: P, layout: DatasetLayout) -> Result<Self, AuError> {
        if !layout.video_template.contains(constant::SUBJECT_PLACEHOLDER) {
            return Err(AuError::ConfigError(format!(
                "Video template '{}' must contain the {} placeholder",
                layout.video_template,
                constant::SUBJECT_PLACEHOLDER
            )));
        }

        let root = std::path::absolute(root.as_ref())
            .map_err(|err| AuError::DirError(format!("{}: {}", root.as_ref().display(), err)))?;

        Ok(Self { root, layout })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Sorted subject identifiers
    pub fn subjects(&self) -> Result<Vec<String>, AuError> {
        ut::path::collect_sorted_dirs(self.root.join(&self.layout.label_dir))
    }

    /// Directory holding the per-unit label files of a subject
    pub fn label_dir_for(&self, subject: &str) -> PathBuf {
        self.root.join(&self.layout.label_dir).join(subject)
    }

    /// Video file (or frame directory) of a subject
    pub fn video_path(&self, subject: &str) -> PathBuf {
        self.root.join(&self.layout.video_dir).join(
            self.layout
                .video_template
                .replace(constant::SUBJECT_PLACEHOLDER, subject),
        )
    }

    /// Resolve the cache root for this dataset
    ///
    /// An explicit path wins, then the `AUCACHE_DIR` environment variable,
    /// then `<parent of root>/pre_processed/<lowercased root name>`.
    ///
    /// # Arguments
    ///
    /// * `explicit` - Optional user-provided cache location
    pub fn cache_dir(&self, explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }

        if let Ok(cache) = std::env::var(constant::CACHE_ENV) {
            if !cache.is_empty() {
                return PathBuf::from(cache);
            }
        }

        self.default_cache_dir()
    }

    fn default_cache_dir(&self) -> PathBuf {
        let name = self
            .root
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "dataset".to_string());

        self.root
            .parent()
            .unwrap_or_else(|| Path::new("/"))
            .join(constant::CACHE_DIR)
            .join(name)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_default_layout_paths() {
        let dataset = Dataset::new("/data/DISFA", DatasetLayout::default()).unwrap();

        assert_eq!(
            dataset.label_dir_for("SN001"),
            PathBuf::from("/data/DISFA/ActionUnitsLabels/SN001")
        );
        assert_eq!(
            dataset.video_path("SN001"),
            PathBuf::from("/data/DISFA/Right_Video/RightVideoSN001_comp.avi")
        );
        assert_eq!(
            dataset.default_cache_dir(),
            PathBuf::from("/data/pre_processed/disfa")
        );
    }

    #[test]
    fn test_explicit_cache_dir() {
        let dataset = Dataset::new("/data/DISFA", DatasetLayout::default()).unwrap();
        assert_eq!(
            dataset.cache_dir(Some(Path::new("/scratch/cache"))),
            PathBuf::from("/scratch/cache")
        );
    }

    #[test]
    fn test_left_camera_layout() {
        let layout = DatasetLayout {
            video_dir: "Left_Video".to_string(),
            video_template: "LeftVideo{id}_comp.avi".to_string(),
            ..Default::default()
        };

        let dataset = Dataset::new("/data/DISFA", layout).unwrap();
        assert_eq!(
            dataset.video_path("SN002"),
            PathBuf::from("/data/DISFA/Left_Video/LeftVideoSN002_comp.avi")
        );
    }

    #[test]
    fn test_template_requires_placeholder() {
        let layout = DatasetLayout {
            video_template: "video.avi".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            Dataset::new("/data/DISFA", layout),
            Err(AuError::ConfigError(_))
        ));
    }

    #[test]
    fn test_subjects_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join(constant::LABEL_DIR);

        for subject in ["SN010", "SN002", "SN001"] {
            std::fs::create_dir_all(labels.join(subject)).unwrap();
        }

        let dataset = Dataset::new(dir.path(), DatasetLayout::default()).unwrap();
        assert_eq!(dataset.subjects().unwrap(), vec!["SN001", "SN002", "SN010"]);
    }

    #[test]
    fn test_missing_label_dir() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset::new(dir.path(), DatasetLayout::default()).unwrap();
        assert!(matches!(dataset.subjects(), Err(AuError::DirError(_))));
    }
}
