// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::sync::Arc;

use image::RgbImage;

use crate::corpus::loader::Corpus;
use crate::error::AuError;
use crate::io;
use crate::labels::LabelRecord;
use crate::source::Landmarks;

/// Transform applied to every mesh read from a dataset
pub type MeshTransform = Arc<dyn Fn(Landmarks) -> Landmarks + Send + Sync>;

/// A decoded corpus position
#[derive(Debug, Clone, PartialEq)]
pub struct AuSample {
    pub subject: String,
    pub frame: usize,
    pub image: RgbImage,
    pub mesh: Landmarks,
    pub label: LabelRecord,
}

/// Indexable view over an aligned corpus
///
/// Samples are read from disk on access, so the dataset stays cheap to
/// hold and clone.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use aucache_core::corpus::{AuDataset, LoadPolicy, load_corpus};
/// use aucache_core::source::Landmarks;
/// use aucache_core::store::ArtifactStore;
///
/// let store = ArtifactStore::open("data/pre_processed/disfa").unwrap();
/// let corpus = load_corpus(&store, &["SN001".to_string()], LoadPolicy::Intersect).unwrap();
///
/// let dataset = AuDataset::new(corpus).with_transform(Arc::new(|mesh: Landmarks| mesh));
/// for sample in dataset.iter() {
///     let sample = sample.unwrap();
///     println!("{} {} {:?}", sample.subject, sample.frame, sample.label.action_units);
/// }
/// ```
#[derive(Clone)]
pub struct AuDataset {
    corpus: Corpus,
    transform: Option<MeshTransform>,
}

impl AuDataset {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            corpus,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: MeshTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    /// Read the crop, mesh and label record at a position
    pub fn get(&self, index: usize) -> Result<AuSample, AuError> {
        let entry = self.corpus.entry(index).ok_or(AuError::IndexError {
            index,
            len: self.len(),
        })?;

        let image = io::read_image(entry.image)?;
        let mesh = io::read_mesh(entry.mesh)?;
        let label = LabelRecord::open(entry.label)?;

        let mesh = match &self.transform {
            Some(transform) => transform(mesh),
            None => mesh,
        };

        Ok(AuSample {
            subject: entry.subject.to_string(),
            frame: entry.frame,
            image,
            mesh,
            label,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<AuSample, AuError>> + '_ {
        (0..self.len()).map(|index| self.get(index))
    }
}

impl std::fmt::Debug for AuDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuDataset")
            .field("len", &self.len())
            .field("transform", &self.transform.is_some())
            .finish()
    }
}
