// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::constant;
use crate::error::AuError;
use crate::ut;

/// The per-frame artifact streams written for every subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Frame,
    Mesh,
    Crop,
    Label,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Frame,
        ArtifactKind::Mesh,
        ArtifactKind::Crop,
        ArtifactKind::Label,
    ];

    /// Tag embedded in artifact file names
    pub fn tag(&self) -> &'static str {
        match self {
            ArtifactKind::Frame => "frame",
            ArtifactKind::Mesh => "mesh",
            ArtifactKind::Crop => "crop",
            ArtifactKind::Label => "au",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Frame => constant::FRAME_EXTENSION,
            ArtifactKind::Mesh => constant::MESH_EXTENSION,
            ArtifactKind::Crop => constant::CROP_EXTENSION,
            ArtifactKind::Label => constant::LABEL_EXTENSION,
        }
    }

    /// Directory of this stream relative to the cache root
    fn relative_dir(&self) -> &'static [&'static str] {
        match self {
            ArtifactKind::Frame => &["images", "frame"],
            ArtifactKind::Mesh => &["facemesh"],
            ArtifactKind::Crop => &["images", "crop"],
            ArtifactKind::Label => &["action_units"],
        }
    }
}

/// Parse the frame index out of an artifact file name
///
/// Artifact names follow `<subject>_<tag>_<index>.<ext>`, so the index is
/// whatever follows the last underscore of the file stem.
///
/// # Examples
///
/// ```
/// use aucache_core::store::parse_frame_index;
///
/// assert_eq!(parse_frame_index("SN001_crop_0042.jpg"), Some(42));
/// assert_eq!(parse_frame_index("SN_001_au_1000.json"), Some(1000));
/// assert_eq!(parse_frame_index("notes.txt"), None);
/// ```
pub fn parse_frame_index<P: AsRef<Path>>(path: P) -> Option<usize> {
    let stem = path.as_ref().file_stem()?.to_str()?;
    let (_, index) = stem.rsplit_once('_')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    index.parse().ok()
}

/// Subject identifiers read from the completeness ledger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: Vec<String>,
}

impl Ledger {
    /// Parse ledger contents, ignoring blank lines and repeated entries
    pub fn parse(contents: &str) -> Self {
        let mut seen = HashSet::new();
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| seen.insert(line.to_string()))
            .map(str::to_string)
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.entries.iter().any(|entry| entry == subject)
    }
}

/// Filesystem-backed cache of extracted artifacts
///
/// The cache holds one directory per artifact stream and subject plus an
/// append-only ledger of finished subjects. Paths are derived only from
/// the subject and frame index so repeated runs resolve to the same files.
///
/// # Examples
///
/// ```no_run
/// use aucache_core::store::{ArtifactKind, ArtifactStore};
///
/// let store = ArtifactStore::open("pre_processed/disfa").unwrap();
/// store.ensure_layout("SN001").unwrap();
/// let crop = store.path_for("SN001", ArtifactKind::Crop, 0);
/// ```
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    ledger_lock: Mutex<()>,
}

impl ArtifactStore {
    /// Open a store, creating the cache root if absent
    ///
    /// # Arguments
    ///
    /// * `root` - Cache root directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, AuError> {
        let root = root.as_ref().to_path_buf();

        std::fs::create_dir_all(&root)
            .map_err(|err| AuError::DirError(format!("{}: {}", root.display(), err)))?;

        Ok(Self {
            root,
            ledger_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(constant::LEDGER_FILE)
    }

    /// Directory of one artifact stream for a subject
    pub fn subject_dir(&self, subject: &str, kind: ArtifactKind) -> PathBuf {
        kind.relative_dir()
            .iter()
            .fold(self.root.clone(), |path, part| path.join(part))
            .join(subject)
    }

    /// Deterministic path of one artifact
    ///
    /// # Arguments
    ///
    /// * `subject` - Subject identifier
    /// * `kind` - Artifact stream
    /// * `index` - Zero-based frame index
    pub fn path_for(&self, subject: &str, kind: ArtifactKind, index: usize) -> PathBuf {
        self.subject_dir(subject, kind).join(format!(
            "{}_{}_{:0width$}.{}",
            subject,
            kind.tag(),
            index,
            kind.extension(),
            width = constant::INDEX_WIDTH
        ))
    }

    /// Marker recording that no face was detected in a frame
    pub fn no_face_marker(&self, subject: &str, index: usize) -> PathBuf {
        self.path_for(subject, ArtifactKind::Mesh, index)
            .with_extension(constant::NO_FACE_EXTENSION)
    }

    /// Create every artifact directory of a subject if absent
    ///
    /// Temp files left by an interrupted atomic write are removed, so this
    /// must only be called by the worker owning the subject.
    pub fn ensure_layout(&self, subject: &str) -> Result<(), AuError> {
        for kind in ArtifactKind::ALL {
            let dir = self.subject_dir(subject, kind);
            std::fs::create_dir_all(&dir)
                .map_err(|err| AuError::DirError(format!("{}: {}", dir.display(), err)))?;
            ut::path::remove_stale_temporaries(&dir)?;
        }

        Ok(())
    }

    /// Whether a frame needs no further extraction work
    ///
    /// A frame is done once its raw image exists together with either the
    /// mesh and crop pair or a no-face marker.
    pub fn frame_is_persisted(&self, subject: &str, index: usize) -> bool {
        if !self.path_for(subject, ArtifactKind::Frame, index).exists() {
            return false;
        }

        let detected = self.path_for(subject, ArtifactKind::Mesh, index).exists()
            && self.path_for(subject, ArtifactKind::Crop, index).exists();

        detected || self.no_face_marker(subject, index).exists()
    }
}

// >>> LEDGER METHODS

impl ArtifactStore {
    /// Read the ledger; a missing or unreadable ledger reads as empty
    pub fn ledger(&self) -> Ledger {
        std::fs::read_to_string(self.ledger_path())
            .map(|contents| Ledger::parse(&contents))
            .unwrap_or_default()
    }

    /// True iff the ledger holds as many subjects as the dataset
    ///
    /// # Arguments
    ///
    /// * `subjects` - Current subject population
    pub fn is_fully_processed(&self, subjects: &[String]) -> bool {
        self.ledger_path().exists() && self.ledger().len() == subjects.len()
    }

    pub fn is_subject_done(&self, subject: &str) -> bool {
        self.ledger().contains(subject)
    }

    /// Append a finished subject to the ledger and sync it to disk
    pub fn mark_subject_done(&self, subject: &str) -> Result<(), AuError> {
        let _guard = self
            .ledger_lock
            .lock()
            .map_err(|_| AuError::LedgerError("Ledger lock was poisoned".to_string()))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.ledger_path())
            .map_err(|err| AuError::LedgerError(err.to_string()))?;

        writeln!(file, "{}", subject).map_err(|err| AuError::LedgerError(err.to_string()))?;
        file.sync_all()
            .map_err(|err| AuError::LedgerError(err.to_string()))?;

        Ok(())
    }

    /// Cheap file-count check of a finished subject
    ///
    /// The subject must have at least one frame, every frame must be
    /// persisted (mesh and crop, or a no-face marker) and there must be
    /// exactly one label record per frame.
    pub fn verify_subject(&self, subject: &str) -> bool {
        let count = |kind: ArtifactKind| {
            ut::path::collect_sorted_files(self.subject_dir(subject, kind), &[kind.extension()])
                .map(|files| files.len())
                .ok()
        };

        let (Some(frames), Some(labels)) = (count(ArtifactKind::Frame), count(ArtifactKind::Label))
        else {
            return false;
        };

        frames > 0
            && frames == labels
            && (0..frames).all(|index| self.frame_is_persisted(subject, index))
    }
}

// <<< LEDGER METHODS

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_path_for() {
        let store = ArtifactStore::open(tempfile::tempdir().unwrap().path()).unwrap();
        let root = store.root().to_path_buf();

        assert_eq!(
            store.path_for("SN001", ArtifactKind::Frame, 7),
            root.join("images/frame/SN001/SN001_frame_0007.jpg")
        );
        assert_eq!(
            store.path_for("SN001", ArtifactKind::Crop, 7),
            root.join("images/crop/SN001/SN001_crop_0007.jpg")
        );
        assert_eq!(
            store.path_for("SN001", ArtifactKind::Mesh, 4844),
            root.join("facemesh/SN001/SN001_mesh_4844.npy")
        );
        assert_eq!(
            store.path_for("SN001", ArtifactKind::Label, 12345),
            root.join("action_units/SN001/SN001_au_12345.json")
        );
        assert_eq!(
            store.no_face_marker("SN001", 3),
            root.join("facemesh/SN001/SN001_mesh_0003.noface")
        );
    }

    #[test]
    fn test_parse_frame_index_roundtrip() {
        let store = ArtifactStore::open(tempfile::tempdir().unwrap().path()).unwrap();
        for kind in ArtifactKind::ALL {
            assert_eq!(parse_frame_index(store.path_for("SN_01", kind, 31)), Some(31));
        }
        assert_eq!(parse_frame_index(store.no_face_marker("SN001", 9)), Some(9));
        assert_eq!(parse_frame_index("SN001_crop_00a1.jpg"), None);
    }

    #[test]
    fn test_ensure_layout_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        store.ensure_layout("SN001").unwrap();
        store.ensure_layout("SN001").unwrap();

        for kind in ArtifactKind::ALL {
            assert!(store.subject_dir("SN001", kind).is_dir());
        }
    }

    #[test]
    fn test_ensure_layout_clears_interrupted_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        store.ensure_layout("SN001").unwrap();

        let frame = store.path_for("SN001", ArtifactKind::Frame, 0);
        let orphan = store
            .subject_dir("SN001", ArtifactKind::Mesh)
            .join("SN001_mesh_0000.npy.tmp.311.1700000000000");
        std::fs::write(&frame, b"jpeg").unwrap();
        std::fs::write(&orphan, b"").unwrap();

        store.ensure_layout("SN001").unwrap();

        assert!(frame.is_file());
        assert!(!orphan.exists());
    }

    #[test]
    fn test_ledger_completeness() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        let subjects = vec!["SN001".to_string(), "SN002".to_string()];

        assert!(!store.is_fully_processed(&subjects));

        store.mark_subject_done("SN001").unwrap();
        assert!(store.is_subject_done("SN001"));
        assert!(!store.is_subject_done("SN002"));
        assert!(!store.is_fully_processed(&subjects));

        store.mark_subject_done("SN002").unwrap();
        assert!(store.is_fully_processed(&subjects));

        let contents = std::fs::read_to_string(store.ledger_path()).unwrap();
        assert_eq!(contents, "SN001\nSN002\n");
    }

    #[test]
    fn test_ledger_ignores_repeats_and_blanks() {
        let ledger = Ledger::parse("SN001\n\nSN002\nSN001\n  \n");
        assert_eq!(ledger.entries(), &["SN001".to_string(), "SN002".to_string()]);
    }

    #[test]
    fn test_unreadable_ledger_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        // A directory at the ledger path cannot be read as a file
        std::fs::create_dir(store.ledger_path()).unwrap();

        assert!(store.ledger().is_empty());
        assert!(!store.is_fully_processed(&["SN001".to_string()]));
    }

    #[test]
    fn test_frame_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        store.ensure_layout("SN001").unwrap();

        assert!(!store.frame_is_persisted("SN001", 0));

        std::fs::write(store.path_for("SN001", ArtifactKind::Frame, 0), b"").unwrap();
        assert!(!store.frame_is_persisted("SN001", 0));

        std::fs::write(store.path_for("SN001", ArtifactKind::Mesh, 0), b"").unwrap();
        assert!(!store.frame_is_persisted("SN001", 0));

        std::fs::write(store.path_for("SN001", ArtifactKind::Crop, 0), b"").unwrap();
        assert!(store.frame_is_persisted("SN001", 0));

        std::fs::write(store.path_for("SN001", ArtifactKind::Frame, 1), b"").unwrap();
        std::fs::write(store.no_face_marker("SN001", 1), b"").unwrap();
        assert!(store.frame_is_persisted("SN001", 1));
    }

    #[test]
    fn test_verify_subject() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();

        assert!(!store.verify_subject("SN001"));

        store.ensure_layout("SN001").unwrap();
        assert!(!store.verify_subject("SN001"));

        for index in 0..2 {
            std::fs::write(store.path_for("SN001", ArtifactKind::Frame, index), b"").unwrap();
            std::fs::write(store.path_for("SN001", ArtifactKind::Label, index), b"").unwrap();
        }
        std::fs::write(store.path_for("SN001", ArtifactKind::Mesh, 0), b"").unwrap();
        std::fs::write(store.path_for("SN001", ArtifactKind::Crop, 0), b"").unwrap();
        assert!(!store.verify_subject("SN001"));

        std::fs::write(store.no_face_marker("SN001", 1), b"").unwrap();
        assert!(store.verify_subject("SN001"));

        std::fs::write(store.path_for("SN001", ArtifactKind::Label, 2), b"").unwrap();
        assert!(!store.verify_subject("SN001"));
    }
}
