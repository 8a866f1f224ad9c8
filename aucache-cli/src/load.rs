// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::fmt::Write;

use clap::Args;

use aucache_core::corpus::{AuCorpus, AuCorpusOptions, AuDataset, GapReason, LoadPolicy};
use aucache_core::pipeline::PipelineOptions;
use aucache_core::store::ArtifactStore;
use aucache_core::ut;

use crate::args::{DatasetArgs, FoldArgs};

#[derive(Debug, Args)]
#[command(about = "Load the train and test corpora from the cache.")]
pub struct LoadArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub folds: FoldArgs,

    #[arg(long, help = "Fail on frames with missing artifacts.")]
    pub strict: bool,

    #[arg(short = 'o', long, help = "Write a tab-separated corpus index.")]
    pub output: Option<String>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

fn summary(name: &str, dataset: &AuDataset, persons: usize) -> String {
    let corpus = dataset.corpus();

    format!(
        "Loaded {} {} entries from {} subjects ({} no-face, {} missing frames).",
        ut::track::thousands_format(dataset.len()),
        name,
        persons,
        corpus.gap_count(GapReason::NoFace),
        corpus.gap_count(GapReason::Missing),
    )
}

/// Corpus positions as `split, subject, frame, image, mesh, label` rows
pub fn corpus_index(corpus: &AuCorpus) -> String {
    let mut index = String::from("split\tsubject\tframe\timage\tmesh\tlabel\n");

    for (name, dataset) in [("train", corpus.train()), ("test", corpus.test())] {
        for entry in dataset.corpus().entries() {
            let _ = writeln!(
                index,
                "{}\t{}\t{}\t{}\t{}\t{}",
                name,
                entry.subject,
                entry.frame,
                entry.image.display(),
                entry.mesh.display(),
                entry.label.display()
            );
        }
    }

    index
}

pub fn load(args: &LoadArgs) {
    let dataset = args.dataset.dataset().unwrap_or_else(|err| {
        eprintln!("[aucache::load] ERROR: {}", err);
        std::process::exit(1);
    });

    let split = args.folds.config().unwrap_or_else(|err| {
        eprintln!("[aucache::load] ERROR: {}", err);
        std::process::exit(1);
    });

    let cache = args.dataset.cache_dir(&dataset);

    if !cache.is_dir() {
        eprintln!(
            "[aucache::load] ERROR: Cache directory {} does not exist. Run `aucache prepare` first.",
            cache.display()
        );
        std::process::exit(1);
    }

    let store = ArtifactStore::open(&cache).unwrap_or_else(|err| {
        eprintln!("[aucache::load] ERROR: {}", err);
        std::process::exit(1);
    });

    let options = AuCorpusOptions {
        pipeline: PipelineOptions {
            verbose: args.verbose,
            ..Default::default()
        },
        split,
        load: if args.strict {
            LoadPolicy::Strict
        } else {
            LoadPolicy::Intersect
        },
        transform: None,
    };

    let corpus = AuCorpus::from_cache(&dataset, &store, options).unwrap_or_else(|err| {
        eprintln!("[aucache::load] ERROR: {}", err);
        std::process::exit(1);
    });

    println!("{}", summary("train", corpus.train(), corpus.train_persons().len()));
    println!("{}", summary("test", corpus.test(), corpus.test_persons().len()));

    for (name, dataset) in [("train", corpus.train()), ("test", corpus.test())] {
        for subject in dataset.corpus().missing_subjects() {
            ut::track::progress_warn(
                &format!("{} subject {} has no cached artifacts.", name, subject),
                true,
            );
        }
    }

    if let Some(output) = &args.output {
        if let Err(err) = std::fs::write(output, corpus_index(&corpus)) {
            eprintln!("[aucache::load] ERROR: Could not write {}. {}", output, err);
            std::process::exit(1);
        }
    }
}
