// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::Path;

use kdam::{BarExt, TqdmParallelIterator};
use rayon::prelude::*;

use crate::dataset::Dataset;
use crate::error::AuError;
use crate::extract::{CropConfig, ExtractionSummary, FrameExtractor};
use crate::labels::LabelAligner;
use crate::source::{LandmarkDetector, VideoSource};
use crate::store::ArtifactStore;
use crate::ut;

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Check,
    Run,
    Done,
}

/// How a completed cache is recognized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletenessPolicy {
    /// The ledger alone decides whether a subject is done
    #[default]
    Trust,
    /// Ledger subjects must also pass a per-subject file-count check
    Verify,
}

/// Opens the per-subject video source and landmark detector
///
/// Both are created inside the worker handling the subject, so neither
/// needs to be shared across threads.
pub trait Backend: Sync {
    type Video: VideoSource;
    type Detector: LandmarkDetector;

    fn open_video(&self, subject: &str, path: &Path) -> Result<Self::Video, AuError>;

    fn detector(&self, subject: &str) -> Result<Self::Detector, AuError>;
}

/// Outcome of one fully processed subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSummary {
    pub subject: String,
    pub extraction: ExtractionSummary,
    pub labels: usize,
}

impl SubjectSummary {
    /// True when the video and the label files disagree on the frame count
    pub fn label_mismatch(&self) -> bool {
        self.labels != self.extraction.frames
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: AuError,
}

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub state: PipelineState,
    /// True when the CHECK state found nothing to do
    pub already_complete: bool,
    pub completed: Vec<SubjectSummary>,
    /// Subjects already done before this run
    pub skipped: Vec<String>,
    pub failures: Vec<SubjectFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Completed subjects whose frame and label counts differ
    pub fn label_mismatches(&self) -> Vec<&SubjectSummary> {
        self.completed
            .iter()
            .filter(|summary| summary.label_mismatch())
            .collect()
    }

    /// Failures as `subject<TAB>error` lines
    pub fn failures_tsv(&self) -> String {
        self.failures
            .iter()
            .map(|failure| format!("{}\t{}\n", failure.subject, failure.error))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineOptions {
    pub crop: CropConfig,
    pub policy: CompletenessPolicy,
    /// Process subjects on the global rayon pool
    pub parallel: bool,
    pub verbose: bool,
}

/// Drives every subject of a dataset through extraction and label alignment
///
/// The run is a small state machine. CHECK inspects the ledger and jumps
/// straight to DONE when the cache is complete. RUN processes every subject
/// not yet in the ledger; a failing subject is recorded in the report,
/// left out of the ledger and the run moves on. Restarting after a crash
/// or a failure resumes from the persisted frames.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// use aucache_core::dataset::{Dataset, DatasetLayout};
/// use aucache_core::error::AuError;
/// use aucache_core::pipeline::{Backend, Pipeline, PipelineOptions};
/// use aucache_core::source::{FfmpegVideo, LandmarkStream};
/// use aucache_core::store::ArtifactStore;
///
/// struct Precomputed;
///
/// impl Backend for Precomputed {
///     type Video = FfmpegVideo;
///     type Detector = LandmarkStream;
///
///     fn open_video(&self, _subject: &str, path: &Path) -> Result<FfmpegVideo, AuError> {
///         FfmpegVideo::open(path)
///     }
///
///     fn detector(&self, subject: &str) -> Result<LandmarkStream, AuError> {
///         LandmarkStream::open(format!("landmarks/{}.jsonl", subject))
///     }
/// }
///
/// let dataset = Dataset::new("data/DISFA", DatasetLayout::default()).unwrap();
/// let store = ArtifactStore::open(dataset.cache_dir(None)).unwrap();
/// let report = Pipeline::new(&dataset, &store, &Precomputed, PipelineOptions::default())
///     .run()
///     .unwrap();
/// ```
pub struct Pipeline<'a, B: Backend> {
    dataset: &'a Dataset,
    store: &'a ArtifactStore,
    backend: &'a B,
    options: PipelineOptions,
}

impl<'a, B: Backend> Pipeline<'a, B> {
    pub fn new(
        dataset: &'a Dataset,
        store: &'a ArtifactStore,
        backend: &'a B,
        options: PipelineOptions,
    ) -> Self {
        Self {
            dataset,
            store,
            backend,
            options,
        }
    }

    /// Run the pipeline until DONE
    ///
    /// Only configuration problems and an unreadable label directory are
    /// returned as errors; per-subject problems land in the report.
    pub fn run(&self) -> Result<RunReport, AuError> {
        self.options.crop.validate()?;

        let subjects = self.dataset.subjects()?;
        let verbose = self.options.verbose;

        let mut state = PipelineState::Check;
        let mut report = RunReport {
            state,
            already_complete: false,
            completed: vec![],
            skipped: vec![],
            failures: vec![],
        };

        while state != PipelineState::Done {
            state = match state {
                PipelineState::Check => {
                    if self.is_complete(&subjects) {
                        ut::track::progress_log("Cache is complete. Nothing to do.", verbose);
                        report.already_complete = true;
                        report.skipped = subjects.clone();
                        PipelineState::Done
                    } else {
                        PipelineState::Run
                    }
                }
                PipelineState::Run => {
                    let (pending, skipped): (Vec<&String>, Vec<&String>) = subjects
                        .iter()
                        .partition(|subject| !self.subject_is_done(subject));

                    ut::track::progress_log(
                        &format!(
                            "Processing {} of {} subjects.",
                            ut::track::thousands_format(pending.len()),
                            ut::track::thousands_format(subjects.len())
                        ),
                        verbose,
                    );

                    report.skipped = skipped.into_iter().cloned().collect();

                    for (subject, outcome) in self.run_subjects(&pending) {
                        match outcome {
                            Ok(summary) => report.completed.push(summary),
                            Err(error) => {
                                ut::track::progress_warn(
                                    &format!("Subject {} failed. {}", subject, error),
                                    verbose,
                                );
                                report.failures.push(SubjectFailure { subject, error });
                            }
                        }
                    }

                    ut::track::progress_log(
                        &format!(
                            "Complete. {} subjects processed, {} failed.",
                            ut::track::thousands_format(report.completed.len()),
                            ut::track::thousands_format(report.failures.len())
                        ),
                        verbose,
                    );

                    PipelineState::Done
                }
                PipelineState::Done => PipelineState::Done,
            };
        }

        report.state = state;

        Ok(report)
    }

    fn is_complete(&self, subjects: &[String]) -> bool {
        match self.options.policy {
            CompletenessPolicy::Trust => self.store.is_fully_processed(subjects),
            CompletenessPolicy::Verify => {
                self.store.is_fully_processed(subjects)
                    && subjects
                        .iter()
                        .all(|subject| self.store.verify_subject(subject))
            }
        }
    }

    fn subject_is_done(&self, subject: &str) -> bool {
        match self.options.policy {
            CompletenessPolicy::Trust => self.store.is_subject_done(subject),
            CompletenessPolicy::Verify => {
                self.store.is_subject_done(subject) && self.store.verify_subject(subject)
            }
        }
    }

    fn run_subjects(&self, pending: &[&String]) -> Vec<(String, Result<SubjectSummary, AuError>)> {
        let mut pb = ut::track::progress_bar(pending.len(), "Subjects", self.options.verbose);

        let outcomes = if self.options.parallel {
            pending
                .par_iter()
                .tqdm_with_bar(pb)
                .map(|subject| (subject.to_string(), self.process_subject(subject)))
                .collect()
        } else {
            pending
                .iter()
                .map(|subject| {
                    let outcome = (subject.to_string(), self.process_subject(subject));
                    let _ = pb.update(1);
                    outcome
                })
                .collect()
        };

        if self.options.verbose {
            println!();
        }

        outcomes
    }

    /// Extract frames and labels of one subject and mark it done
    ///
    /// # Arguments
    ///
    /// * `subject` - Subject identifier
    pub fn process_subject(&self, subject: &str) -> Result<SubjectSummary, AuError> {
        self.store.ensure_layout(subject)?;

        let mut video = self
            .backend
            .open_video(subject, &self.dataset.video_path(subject))?;
        let mut detector = self.backend.detector(subject)?;

        let extraction = FrameExtractor::new(self.store, self.options.crop).extract(
            subject,
            &mut video,
            &mut detector,
        )?;

        let labels =
            LabelAligner::new(self.store).process(subject, self.dataset.label_dir_for(subject))?;

        let summary = SubjectSummary {
            subject: subject.to_string(),
            extraction,
            labels,
        };

        if summary.label_mismatch() {
            ut::track::progress_warn(
                &format!(
                    "Subject {} has {} frames but {} label records.",
                    subject, extraction.frames, labels
                ),
                self.options.verbose,
            );
        }

        self.store.mark_subject_done(subject)?;

        Ok(summary)
    }
}

#[cfg(test)]
mod test {

    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::{Rgb, RgbImage};

    use super::*;
    use crate::dataset::DatasetLayout;
    use crate::source::{Landmarks, MemoryVideo};
    use crate::store::ArtifactKind;

    struct Scripted {
        frames: usize,
        opened: AtomicUsize,
        broken: Option<&'static str>,
    }

    impl Scripted {
        fn new(frames: usize) -> Self {
            Self {
                frames,
                opened: AtomicUsize::new(0),
                broken: None,
            }
        }
    }

    impl Backend for Scripted {
        type Video = MemoryVideo;
        type Detector = fn(&RgbImage) -> Option<Landmarks>;

        fn open_video(&self, subject: &str, path: &Path) -> Result<MemoryVideo, AuError> {
            self.opened.fetch_add(1, Ordering::SeqCst);

            if self.broken == Some(subject) {
                return Err(AuError::VideoOpenError(path.display().to_string()));
            }

            Ok(MemoryVideo::new(
                (0..self.frames)
                    .map(|_| RgbImage::from_pixel(32, 32, Rgb([90, 60, 30])))
                    .collect(),
            ))
        }

        fn detector(&self, _subject: &str) -> Result<Self::Detector, AuError> {
            fn detect(_frame: &RgbImage) -> Option<Landmarks> {
                Landmarks::new(vec![[0.3, 0.3, 0.0], [0.7, 0.7, 0.0]]).ok()
            }

            Ok(detect)
        }
    }

    fn dataset_with(root: &Path, subjects: &[&str], frames: usize) -> Dataset {
        for subject in subjects {
            let labels = root.join("ActionUnitsLabels").join(subject);
            std::fs::create_dir_all(&labels).unwrap();
            for unit in ["AU1", "AU2"] {
                let contents: String = (0..frames).map(|i| format!("{},{}\n", i + 1, i % 3)).collect();
                std::fs::write(labels.join(format!("{}_{}.txt", subject, unit)), contents).unwrap();
            }
        }

        Dataset::new(root, DatasetLayout::default()).unwrap()
    }

    fn write_unit(root: &Path, subject: &str, unit: &str, frames: usize) {
        let contents: String = (0..frames).map(|i| format!("{},0\n", i + 1)).collect();
        let labels = root.join("ActionUnitsLabels").join(subject);
        std::fs::write(labels.join(format!("{}_{}.txt", subject, unit)), contents).unwrap();
    }

    #[test]
    fn test_run_then_noop() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dataset_with(&dir.path().join("DISFA"), &["SN002", "SN001"], 3);
        let store = ArtifactStore::open(dir.path().join("cache")).unwrap();
        let backend = Scripted::new(3);

        let pipeline = Pipeline::new(&dataset, &store, &backend, PipelineOptions::default());

        let report = pipeline.run().unwrap();
        assert_eq!(report.state, PipelineState::Done);
        assert!(!report.already_complete);
        assert!(report.is_success());
        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.completed[0].subject, "SN001");
        assert_eq!(report.completed[0].extraction.detected, 3);
        assert_eq!(report.completed[0].labels, 3);
        assert_eq!(store.ledger().entries(), ["SN001", "SN002"]);

        let report = pipeline.run().unwrap();
        assert!(report.already_complete);
        assert!(report.completed.is_empty());
        assert_eq!(report.skipped, ["SN001", "SN002"]);
        assert_eq!(backend.opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failure_is_recorded_and_not_marked() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dataset_with(&dir.path().join("DISFA"), &["SN001", "SN002", "SN003"], 2);
        let store = ArtifactStore::open(dir.path().join("cache")).unwrap();
        let mut backend = Scripted::new(2);
        backend.broken = Some("SN002");

        let report = Pipeline::new(&dataset, &store, &backend, PipelineOptions::default())
            .run()
            .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subject, "SN002");
        assert!(matches!(report.failures[0].error, AuError::VideoOpenError(_)));
        assert!(report.failures_tsv().starts_with("SN002\t[aucache::VideoOpenError]"));
        assert_eq!(store.ledger().entries(), ["SN001", "SN003"]);

        backend.broken = None;
        let report = Pipeline::new(&dataset, &store, &backend, PipelineOptions::default())
            .run()
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.skipped, ["SN001", "SN003"]);
        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed[0].subject, "SN002");
        assert!(store.is_fully_processed(&dataset.subjects().unwrap()));
    }

    #[test]
    fn test_unequal_label_files_fail_subject() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("DISFA");
        let dataset = dataset_with(&root, &["SN001", "SN002"], 3);
        write_unit(&root, "SN002", "AU2", 2);

        let store = ArtifactStore::open(dir.path().join("cache")).unwrap();
        let backend = Scripted::new(3);

        let report = Pipeline::new(&dataset, &store, &backend, PipelineOptions::default())
            .run()
            .unwrap();

        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subject, "SN002");
        assert_eq!(
            report.failures[0].error,
            AuError::LabelLengthMismatch {
                subject: "SN002".to_string(),
                unit: "AU2".to_string(),
                expected: 3,
                found: 2,
            }
        );
        assert_eq!(store.ledger().entries(), ["SN001"]);
        assert!(!store.path_for("SN002", ArtifactKind::Label, 0).exists());
    }

    #[test]
    fn test_label_count_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("DISFA");
        let dataset = dataset_with(&root, &["SN001", "SN002"], 3);
        write_unit(&root, "SN002", "AU1", 4);
        write_unit(&root, "SN002", "AU2", 4);

        let store = ArtifactStore::open(dir.path().join("cache")).unwrap();
        let backend = Scripted::new(3);

        let report = Pipeline::new(&dataset, &store, &backend, PipelineOptions::default())
            .run()
            .unwrap();

        assert!(report.is_success());
        assert!(!report.completed[0].label_mismatch());

        let mismatches = report.label_mismatches();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].subject, "SN002");
        assert_eq!(mismatches[0].extraction.frames, 3);
        assert_eq!(mismatches[0].labels, 4);
        assert!(store.is_subject_done("SN002"));
    }

    #[test]
    fn test_parallel_run() {
        let dir = tempfile::tempdir().unwrap();
        let subjects = ["SN001", "SN002", "SN003", "SN004"];
        let dataset = dataset_with(&dir.path().join("DISFA"), &subjects, 2);
        let store = ArtifactStore::open(dir.path().join("cache")).unwrap();
        let backend = Scripted::new(2);

        let options = PipelineOptions {
            parallel: true,
            ..Default::default()
        };

        let report = Pipeline::new(&dataset, &store, &backend, options).run().unwrap();

        assert_eq!(report.completed.len(), 4);
        let mut ledger = store.ledger().entries().to_vec();
        ledger.sort();
        assert_eq!(ledger, subjects);
        for subject in subjects {
            assert!(store.verify_subject(subject));
        }
    }

    #[test]
    fn test_verify_policy_reprocesses_damaged_subject() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dataset_with(&dir.path().join("DISFA"), &["SN001", "SN002"], 3);
        let store = ArtifactStore::open(dir.path().join("cache")).unwrap();
        let backend = Scripted::new(3);

        Pipeline::new(&dataset, &store, &backend, PipelineOptions::default())
            .run()
            .unwrap();

        std::fs::remove_file(store.path_for("SN002", ArtifactKind::Crop, 1)).unwrap();

        let trusted = Pipeline::new(&dataset, &store, &backend, PipelineOptions::default())
            .run()
            .unwrap();
        assert!(trusted.already_complete);

        let options = PipelineOptions {
            policy: CompletenessPolicy::Verify,
            ..Default::default()
        };
        let verified = Pipeline::new(&dataset, &store, &backend, options).run().unwrap();

        assert!(!verified.already_complete);
        assert_eq!(verified.skipped, ["SN001"]);
        assert_eq!(verified.completed.len(), 1);
        assert_eq!(verified.completed[0].extraction.detected, 1);
        assert_eq!(verified.completed[0].extraction.skipped, 2);
        assert!(store.verify_subject("SN002"));
    }

    #[test]
    fn test_invalid_crop_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dataset_with(&dir.path().join("DISFA"), &["SN001"], 1);
        let store = ArtifactStore::open(dir.path().join("cache")).unwrap();
        let backend = Scripted::new(1);

        let options = PipelineOptions {
            crop: CropConfig { margin: -1.0, size: 256 },
            ..Default::default()
        };

        assert!(matches!(
            Pipeline::new(&dataset, &store, &backend, options).run(),
            Err(AuError::ConfigError(_))
        ));
    }
}
