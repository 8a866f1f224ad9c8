// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

pub mod args;
pub mod backend;
pub mod load;
pub mod prepare;
pub mod split;
