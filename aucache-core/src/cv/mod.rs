// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

pub mod facebox;
pub mod transform;

pub use facebox::FaceBox;
pub use transform::crop_face;
