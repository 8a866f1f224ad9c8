// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::{Path, PathBuf};

use clap::Args;

use aucache_core::constant;
use aucache_core::dataset::{Dataset, DatasetLayout};
use aucache_core::error::AuError;
use aucache_core::split::SplitConfig;

/// Location and layout of the raw dataset
#[derive(Debug, Args)]
pub struct DatasetArgs {
    #[arg(short = 'r', long, help = "Dataset root directory.", required = true)]
    pub root: Option<String>,

    #[arg(
        short = 'c',
        long,
        help = "Cache directory. Defaults to $AUCACHE_DIR or <root>/../pre_processed/<name>."
    )]
    pub cache: Option<String>,

    #[arg(long, help = "Label directory relative to the root.", default_value = constant::LABEL_DIR)]
    pub label_dir: Option<String>,

    #[arg(long, help = "Video directory relative to the root.", default_value = constant::VIDEO_DIR)]
    pub video_dir: Option<String>,

    #[arg(
        long,
        help = "Video file name with an {id} subject placeholder.",
        default_value = constant::VIDEO_TEMPLATE
    )]
    pub video_template: Option<String>,
}

impl DatasetArgs {
    pub fn dataset(&self) -> Result<Dataset, AuError> {
        let root = self
            .root
            .as_deref()
            .ok_or_else(|| AuError::ConfigError("A dataset root is required".to_string()))?;

        let defaults = DatasetLayout::default();
        let layout = DatasetLayout {
            label_dir: self.label_dir.clone().unwrap_or(defaults.label_dir),
            video_dir: self.video_dir.clone().unwrap_or(defaults.video_dir),
            video_template: self.video_template.clone().unwrap_or(defaults.video_template),
        };

        Dataset::new(root, layout)
    }

    pub fn cache_dir(&self, dataset: &Dataset) -> PathBuf {
        dataset.cache_dir(self.cache.as_deref().map(Path::new))
    }
}

/// Train and test person split settings
#[derive(Debug, Args)]
pub struct FoldArgs {
    #[arg(long, help = "Train and test fold weights.", default_value = "2,1")]
    pub folds: Option<String>,

    #[arg(long, help = "Seed of the person shuffle.", default_value = "42")]
    pub seed: Option<u64>,

    #[arg(long, help = "Zero-based fold selecting the test persons.", default_value = "0")]
    pub fold: Option<usize>,
}

impl FoldArgs {
    pub fn config(&self) -> Result<SplitConfig, AuError> {
        let defaults = SplitConfig::default();

        Ok(SplitConfig {
            folds: match &self.folds {
                Some(folds) => parse_folds(folds)?,
                None => defaults.folds,
            },
            seed: self.seed.unwrap_or(defaults.seed),
            current_fold: self.fold.unwrap_or(defaults.current_fold),
        })
    }
}

/// Parse `train,test` fold weights
pub fn parse_folds(folds: &str) -> Result<[usize; 2], AuError> {
    let weights = folds
        .split(',')
        .map(|weight| weight.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| AuError::ConfigError(format!("Invalid fold weights '{}'", folds)))?;

    match weights.as_slice() {
        [train, test] => Ok([*train, *test]),
        _ => Err(AuError::ConfigError(format!(
            "Expected two fold weights (train,test), found '{}'",
            folds
        ))),
    }
}
