// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::PathBuf;

use clap::Args;

use aucache_core::constant;
use aucache_core::extract::CropConfig;
use aucache_core::pipeline::{CompletenessPolicy, Pipeline, PipelineOptions};
use aucache_core::store::ArtifactStore;
use aucache_core::ut;

use crate::args::DatasetArgs;
use crate::backend::CliBackend;

#[derive(Debug, Args)]
#[command(about = "Extract frames, face meshes, crops and labels into the cache.")]
pub struct PrepareArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[arg(
        short = 'l',
        long,
        help = "Directory of precomputed <subject>.jsonl landmark files.",
        required = true
    )]
    pub landmarks: Option<String>,

    #[arg(long, help = "Side length of the face crops.", default_value = "256")]
    pub crop_size: Option<u32>,

    #[arg(long, help = "Margin added around the landmark extent.", default_value = "0.3")]
    pub margin: Option<f64>,

    #[arg(long, help = "Re-check artifacts of subjects listed in the ledger.")]
    pub verify: bool,

    #[arg(short = 't', long, help = "Number of threads.")]
    pub threads: Option<usize>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

pub fn prepare(args: &PrepareArgs) {
    let dataset = args.dataset.dataset().unwrap_or_else(|err| {
        eprintln!("[aucache::prepare] ERROR: {}", err);
        std::process::exit(1);
    });

    let crop = CropConfig {
        margin: args.margin.unwrap_or(constant::CROP_MARGIN),
        size: args.crop_size.unwrap_or(constant::CROP_SIZE),
    };

    if let Err(err) = crop.validate() {
        eprintln!("[aucache::prepare] ERROR: {}", err);
        std::process::exit(1);
    }

    let threads = args.threads.unwrap_or(1);

    if threads == 0 {
        eprintln!("[aucache::prepare] ERROR: --threads must be at least 1.");
        std::process::exit(1);
    }

    if threads > 1 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .unwrap_or_else(|err| {
                eprintln!("[aucache::prepare] ERROR: Could not build thread pool. {}", err);
                std::process::exit(1);
            });
    }

    let landmarks = PathBuf::from(args.landmarks.to_owned().unwrap_or_default());

    if !landmarks.is_dir() {
        eprintln!(
            "[aucache::prepare] ERROR: Landmark directory {} does not exist.",
            landmarks.display()
        );
        std::process::exit(1);
    }

    let cache = args.dataset.cache_dir(&dataset);

    let store = ArtifactStore::open(&cache).unwrap_or_else(|err| {
        eprintln!("[aucache::prepare] ERROR: {}", err);
        std::process::exit(1);
    });

    ut::track::progress_log(
        &format!("Caching {} into {}.", dataset.root().display(), cache.display()),
        args.verbose,
    );

    let options = PipelineOptions {
        crop,
        policy: if args.verify {
            CompletenessPolicy::Verify
        } else {
            CompletenessPolicy::Trust
        },
        parallel: threads > 1,
        verbose: args.verbose,
    };

    let backend = CliBackend::new(&landmarks);

    let report = Pipeline::new(&dataset, &store, &backend, options)
        .run()
        .unwrap_or_else(|err| {
            eprintln!("[aucache::prepare] ERROR: {}", err);
            std::process::exit(1);
        });

    if report.already_complete {
        println!("Cache is complete: {} subjects.", report.skipped.len());
    } else {
        println!(
            "Processed {} subjects, skipped {}, failed {}.",
            report.completed.len(),
            report.skipped.len(),
            report.failures.len()
        );
    }

    for summary in report.label_mismatches() {
        eprintln!(
            "[aucache::prepare] WARNING: {} has {} frames but {} label records.",
            summary.subject, summary.extraction.frames, summary.labels
        );
    }

    if !report.is_success() {
        let errors = store.root().join(constant::ERRORS_FILE);

        if let Err(err) = std::fs::write(&errors, report.failures_tsv()) {
            eprintln!("[aucache::prepare] ERROR: Could not write {}. {}", errors.display(), err);
        }

        for failure in report.failures.iter() {
            eprintln!("[aucache::prepare] ERROR: {} {}", failure.subject, failure.error);
        }

        std::process::exit(1);
    }
}
