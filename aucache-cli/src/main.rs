// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use aucache_cli::{load, prepare, split};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Prepare(prepare::PrepareArgs),
    Split(split::SplitArgs),
    Load(load::LoadArgs),
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Prepare(prepare_args)) => prepare::prepare(prepare_args),
        Some(Commands::Split(split_args)) => split::split(split_args),
        Some(Commands::Load(load_args)) => load::load(load_args),
        None => {}
    }
}
