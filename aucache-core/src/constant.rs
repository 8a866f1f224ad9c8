// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

// Default raw dataset layout (right camera of the DISFA recordings)
pub const LABEL_DIR: &str = "ActionUnitsLabels";
pub const VIDEO_DIR: &str = "Right_Video";
pub const VIDEO_TEMPLATE: &str = "RightVideo{id}_comp.avi";

// Placeholder substituted with the subject identifier in video templates
pub const SUBJECT_PLACEHOLDER: &str = "{id}";

// Cache location relative to the parent of the dataset root
pub const CACHE_DIR: &str = "pre_processed";

// Environment variable overriding the cache location
pub const CACHE_ENV: &str = "AUCACHE_DIR";

// Completeness ledger file name inside the cache root
pub const LEDGER_FILE: &str = "status.txt";

// Per-subject failures of the last prepare run inside the cache root
pub const ERRORS_FILE: &str = "errors.tsv";

// Fraction of the landmark extent added on each side of the face box
pub const CROP_MARGIN: f64 = 0.3;

// Side length of the square face crops
pub const CROP_SIZE: u32 = 256;

// Zero-padded width of frame indices in artifact file names
pub const INDEX_WIDTH: usize = 4;

// Artifact file extensions
pub const FRAME_EXTENSION: &str = "jpg";
pub const CROP_EXTENSION: &str = "jpg";
pub const MESH_EXTENSION: &str = "npy";
pub const LABEL_EXTENSION: &str = "json";
pub const NO_FACE_EXTENSION: &str = "noface";

// Extension of the raw per-unit label files
pub const RAW_LABEL_EXTENSION: &str = "txt";

// Frame image formats accepted by directory-backed video sources
pub const SUPPORTED_FRAME_FORMATS: [&str; 7] = ["bmp", "jpeg", "jpg", "png", "tif", "tiff", "webp"];
