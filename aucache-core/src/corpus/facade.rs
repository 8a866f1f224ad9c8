// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use crate::corpus::loader::{LoadPolicy, load_corpus};
use crate::corpus::sample::{AuDataset, MeshTransform};
use crate::dataset::Dataset;
use crate::error::AuError;
use crate::pipeline::{Backend, Pipeline, PipelineOptions, RunReport};
use crate::split::{PersonSplit, SplitConfig, split_persons};
use crate::store::ArtifactStore;
use crate::ut;

#[derive(Clone, Default)]
pub struct AuCorpusOptions {
    pub pipeline: PipelineOptions,
    pub split: SplitConfig,
    pub load: LoadPolicy,
    pub transform: Option<MeshTransform>,
}

/// A prepared dataset split into train and test persons
///
/// # Examples
///
/// ```no_run
/// # use std::path::Path;
/// # use aucache_core::error::AuError;
/// # use aucache_core::pipeline::Backend;
/// # use aucache_core::source::{FfmpegVideo, LandmarkStream};
/// # struct Precomputed;
/// # impl Backend for Precomputed {
/// #     type Video = FfmpegVideo;
/// #     type Detector = LandmarkStream;
/// #     fn open_video(&self, _: &str, path: &Path) -> Result<FfmpegVideo, AuError> {
/// #         FfmpegVideo::open(path)
/// #     }
/// #     fn detector(&self, subject: &str) -> Result<LandmarkStream, AuError> {
/// #         LandmarkStream::open(format!("landmarks/{}.jsonl", subject))
/// #     }
/// # }
/// use aucache_core::corpus::{AuCorpus, AuCorpusOptions};
/// use aucache_core::dataset::{Dataset, DatasetLayout};
/// use aucache_core::store::ArtifactStore;
///
/// let dataset = Dataset::new("data/DISFA", DatasetLayout::default()).unwrap();
/// let store = ArtifactStore::open(dataset.cache_dir(None)).unwrap();
/// let corpus = AuCorpus::open(&dataset, &store, &Precomputed, AuCorpusOptions::default()).unwrap();
///
/// println!("{} train samples", corpus.train().len());
/// ```
#[derive(Debug, Clone)]
pub struct AuCorpus {
    split: PersonSplit,
    train: AuDataset,
    test: AuDataset,
    report: Option<RunReport>,
}

impl AuCorpus {
    /// Prepare the cache, then split and load the dataset
    ///
    /// # Arguments
    ///
    /// * `dataset` - Raw dataset
    /// * `store` - Artifact store for the processed dataset
    /// * `backend` - Video and landmark detector provider
    /// * `options` - Pipeline, split and load settings
    pub fn open<B: Backend>(
        dataset: &Dataset,
        store: &ArtifactStore,
        backend: &B,
        options: AuCorpusOptions,
    ) -> Result<Self, AuError> {
        let report = Pipeline::new(dataset, store, backend, options.pipeline).run()?;

        let mut corpus = Self::from_cache(dataset, store, options)?;
        corpus.report = Some(report);

        Ok(corpus)
    }

    /// Split and load a dataset from an already prepared cache
    pub fn from_cache(
        dataset: &Dataset,
        store: &ArtifactStore,
        options: AuCorpusOptions,
    ) -> Result<Self, AuError> {
        let split = split_persons(&dataset.subjects()?, &options.split)?;

        let load = |persons: &[String]| -> Result<AuDataset, AuError> {
            let dataset = AuDataset::new(load_corpus(store, persons, options.load)?);
            Ok(match &options.transform {
                Some(transform) => dataset.with_transform(transform.clone()),
                None => dataset,
            })
        };

        let train = load(&split.train)?;
        let test = load(&split.test)?;

        ut::track::progress_log(
            &format!(
                "Loaded {} train and {} test samples.",
                ut::track::thousands_format(train.len()),
                ut::track::thousands_format(test.len())
            ),
            options.pipeline.verbose,
        );

        Ok(Self {
            split,
            train,
            test,
            report: None,
        })
    }

    pub fn train_persons(&self) -> &[String] {
        &self.split.train
    }

    pub fn test_persons(&self) -> &[String] {
        &self.split.test
    }

    pub fn train(&self) -> &AuDataset {
        &self.train
    }

    pub fn test(&self) -> &AuDataset {
        &self.test
    }

    /// Report of the pipeline run, absent when loaded from cache
    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }
}
