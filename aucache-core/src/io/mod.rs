// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

mod npy;
mod raster;

pub use raster::read_image;
pub use raster::write_image;
pub use raster::write_marker;

pub use npy::read_mesh;
pub use npy::write_mesh;
pub use npy::write_numpy;
