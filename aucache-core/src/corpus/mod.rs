// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

pub mod facade;
pub mod loader;
pub mod sample;

pub use facade::{AuCorpus, AuCorpusOptions};
pub use loader::{Corpus, CorpusEntry, FrameGap, GapReason, LoadPolicy, load_corpus};
pub use sample::{AuDataset, AuSample, MeshTransform};
