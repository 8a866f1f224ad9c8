// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::AuError;
use crate::store::{ArtifactKind, ArtifactStore, parse_frame_index};
use crate::ut;

/// Why a frame is left out of a corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapReason {
    /// The detector found no face in the frame
    NoFace,
    /// At least one artifact is absent without a no-face marker
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGap {
    pub subject: String,
    pub frame: usize,
    pub reason: GapReason,
}

/// Handling of frames with missing artifacts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Keep frames present in every stream and report the rest as gaps
    #[default]
    Intersect,
    /// Fail on any missing artifact or subject; no-face gaps are allowed
    Strict,
}

/// One aligned corpus position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusEntry<'a> {
    pub subject: &'a str,
    pub frame: usize,
    pub image: &'a Path,
    pub mesh: &'a Path,
    pub label: &'a Path,
}

/// Parallel crop, mesh and label sequences of a subject group
///
/// Position `i` refers to the same subject and frame in all three
/// sequences. Subjects appear in group order and frames in ascending
/// index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    images: Vec<PathBuf>,
    meshes: Vec<PathBuf>,
    labels: Vec<PathBuf>,
    frames: Vec<(String, usize)>,
    gaps: Vec<FrameGap>,
    missing_subjects: Vec<String>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn meshes(&self) -> &[PathBuf] {
        &self.meshes
    }

    pub fn labels(&self) -> &[PathBuf] {
        &self.labels
    }

    /// Subject and frame index of every position
    pub fn frames(&self) -> &[(String, usize)] {
        &self.frames
    }

    /// Frames excluded from the corpus
    pub fn gaps(&self) -> &[FrameGap] {
        &self.gaps
    }

    /// Subjects of the group without any cached artifacts
    pub fn missing_subjects(&self) -> &[String] {
        &self.missing_subjects
    }

    pub fn entry(&self, index: usize) -> Option<CorpusEntry<'_>> {
        let (subject, frame) = self.frames.get(index)?;

        Some(CorpusEntry {
            subject,
            frame: *frame,
            image: &self.images[index],
            mesh: &self.meshes[index],
            label: &self.labels[index],
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = CorpusEntry<'_>> {
        (0..self.len()).filter_map(|index| self.entry(index))
    }

    /// Number of gaps with the given reason
    pub fn gap_count(&self, reason: GapReason) -> usize {
        self.gaps.iter().filter(|gap| gap.reason == reason).count()
    }
}

/// Frame-indexed artifact files of one subject and kind
fn indexed_files(
    store: &ArtifactStore,
    subject: &str,
    kind: ArtifactKind,
) -> Result<Option<BTreeMap<usize, PathBuf>>, AuError> {
    let directory = store.subject_dir(subject, kind);

    if !directory.is_dir() {
        return Ok(None);
    }

    let files = ut::path::collect_sorted_files(&directory, &[kind.extension()])?;

    Ok(Some(
        files
            .into_iter()
            .filter_map(|path| parse_frame_index(&path).map(|index| (index, path)))
            .collect(),
    ))
}

/// Enumerate cached artifacts of a subject group into an aligned corpus
///
/// Each subject contributes the frames whose crop, mesh and label files
/// all exist. Every other frame seen in any stream, including the raw
/// frame directory, is reported as a gap.
///
/// # Arguments
///
/// * `store` - Artifact store holding the processed subjects
/// * `persons` - Subject group in the order of the resulting corpus
/// * `policy` - Whether missing artifacts are tolerated
pub fn load_corpus(
    store: &ArtifactStore,
    persons: &[String],
    policy: LoadPolicy,
) -> Result<Corpus, AuError> {
    let mut corpus = Corpus::default();

    for subject in persons {
        let streams = [
            ArtifactKind::Crop,
            ArtifactKind::Mesh,
            ArtifactKind::Label,
            ArtifactKind::Frame,
        ]
        .map(|kind| indexed_files(store, subject, kind));

        let [crops, meshes, labels, frames] = streams;
        let (crops, meshes, labels, frames) = (crops?, meshes?, labels?, frames?);

        if crops.is_none() && meshes.is_none() && labels.is_none() && frames.is_none() {
            if policy == LoadPolicy::Strict {
                return Err(AuError::AlignmentError(format!(
                    "Subject {} has no cached artifacts",
                    subject
                )));
            }

            corpus.missing_subjects.push(subject.clone());
            continue;
        }

        let (crops, meshes, labels, frames) = (
            crops.unwrap_or_default(),
            meshes.unwrap_or_default(),
            labels.unwrap_or_default(),
            frames.unwrap_or_default(),
        );

        let seen: BTreeSet<usize> = crops
            .keys()
            .chain(meshes.keys())
            .chain(labels.keys())
            .chain(frames.keys())
            .copied()
            .collect();

        for frame in seen {
            match (crops.get(&frame), meshes.get(&frame), labels.get(&frame)) {
                (Some(image), Some(mesh), Some(label)) => {
                    corpus.images.push(image.clone());
                    corpus.meshes.push(mesh.clone());
                    corpus.labels.push(label.clone());
                    corpus.frames.push((subject.clone(), frame));
                }
                _ => {
                    let reason = if store.no_face_marker(subject, frame).exists() {
                        GapReason::NoFace
                    } else {
                        GapReason::Missing
                    };

                    if reason == GapReason::Missing && policy == LoadPolicy::Strict {
                        return Err(AuError::AlignmentError(format!(
                            "Subject {} frame {} is missing cached artifacts",
                            subject, frame
                        )));
                    }

                    corpus.gaps.push(FrameGap {
                        subject: subject.clone(),
                        frame,
                        reason,
                    });
                }
            }
        }
    }

    Ok(corpus)
}
