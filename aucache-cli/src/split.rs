// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use clap::Args;

use aucache_core::constant;
use aucache_core::dataset::{Dataset, DatasetLayout};
use aucache_core::split::split_persons;

use crate::args::FoldArgs;

#[derive(Debug, Args)]
#[command(about = "Print the train and test persons of a fold.")]
pub struct SplitArgs {
    #[arg(short = 'r', long, help = "Dataset root directory.", required = true)]
    pub root: Option<String>,

    #[arg(long, help = "Label directory relative to the root.", default_value = constant::LABEL_DIR)]
    pub label_dir: Option<String>,

    #[command(flatten)]
    pub folds: FoldArgs,
}

pub fn split(args: &SplitArgs) {
    let layout = DatasetLayout {
        label_dir: args
            .label_dir
            .to_owned()
            .unwrap_or(constant::LABEL_DIR.to_string()),
        ..Default::default()
    };

    let split = Dataset::new(args.root.to_owned().unwrap_or_default(), layout)
        .and_then(|dataset| dataset.subjects())
        .and_then(|subjects| Ok((subjects, args.folds.config()?)))
        .and_then(|(subjects, config)| split_persons(&subjects, &config))
        .unwrap_or_else(|err| {
            eprintln!("[aucache::split] ERROR: {}", err);
            std::process::exit(1);
        });

    for person in split.train.iter() {
        println!("train\t{}", person);
    }

    for person in split.test.iter() {
        println!("test\t{}", person);
    }
}
