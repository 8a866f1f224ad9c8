// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

pub mod constant;
pub mod corpus;
pub mod cv;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod io;
pub mod labels;
pub mod pipeline;
pub mod source;
pub mod split;
pub mod store;
pub mod ut;
