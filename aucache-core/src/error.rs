// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AuError {
    ConfigError(String),
    DirError(String),
    NoFileError(String),
    VideoOpenError(String),
    VideoReadError(String),
    ImageReadError(String),
    ImageWriteError(String),
    CropError,
    MeshReadError(String),
    MeshWriteError(String),
    LandmarksReadError(String),
    LabelReadError(String),
    LabelParseError {
        path: String,
        line: usize,
    },
    LabelLengthMismatch {
        subject: String,
        unit: String,
        expected: usize,
        found: usize,
    },
    LabelWriteError(String),
    LedgerError(String),
    AlignmentError(String),
    IndexError {
        index: usize,
        len: usize,
    },
}

impl fmt::Display for AuError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuError::ConfigError(message) => {
                write!(f, "[aucache::ConfigError] Invalid configuration. {}.", message)
            }
            AuError::DirError(message) => {
                write!(
                    f,
                    "[aucache::DirError] Directory could not be read or created. {}.",
                    message
                )
            }
            AuError::NoFileError(message) => {
                write!(
                    f,
                    "[aucache::NoFileError] File could not be found. {}.",
                    message
                )
            }
            AuError::VideoOpenError(message) => {
                write!(f, "[aucache::VideoOpenError] Failed to open video. {}.", message)
            }
            AuError::VideoReadError(message) => {
                write!(
                    f,
                    "[aucache::VideoReadError] Failed to decode video. {}.",
                    message
                )
            }
            AuError::ImageReadError(message) => {
                write!(f, "[aucache::ImageReadError] Failed to read image. {}.", message)
            }
            AuError::ImageWriteError(message) => {
                write!(
                    f,
                    "[aucache::ImageWriteError] Failed to write image. {}.",
                    message
                )
            }
            AuError::CropError => {
                write!(
                    f,
                    "[aucache::CropError] The face box is empty after clipping to the image bounds."
                )
            }
            AuError::MeshReadError(message) => {
                write!(f, "[aucache::MeshReadError] Failed to read mesh. {}.", message)
            }
            AuError::MeshWriteError(message) => {
                write!(f, "[aucache::MeshWriteError] Failed to write mesh. {}.", message)
            }
            AuError::LandmarksReadError(message) => {
                write!(
                    f,
                    "[aucache::LandmarksReadError] Failed to read landmarks. {}.",
                    message
                )
            }
            AuError::LabelReadError(message) => {
                write!(
                    f,
                    "[aucache::LabelReadError] Failed to read action unit labels. {}.",
                    message
                )
            }
            AuError::LabelParseError { path, line } => {
                write!(
                    f,
                    "[aucache::LabelParseError] Expected '<value>,<intensity>' at {}:{}.",
                    path, line
                )
            }
            AuError::LabelLengthMismatch {
                subject,
                unit,
                expected,
                found,
            } => {
                write!(
                    f,
                    "[aucache::LabelLengthMismatch] Subject {} has {} frames for {} but {} for the preceding units.",
                    subject, found, unit, expected
                )
            }
            AuError::LabelWriteError(message) => {
                write!(
                    f,
                    "[aucache::LabelWriteError] Failed to write label record. {}.",
                    message
                )
            }
            AuError::LedgerError(message) => {
                write!(
                    f,
                    "[aucache::LedgerError] Failed to update the completeness ledger. {}.",
                    message
                )
            }
            AuError::AlignmentError(message) => {
                write!(
                    f,
                    "[aucache::AlignmentError] Artifact streams are not aligned. {}.",
                    message
                )
            }
            AuError::IndexError { index, len } => {
                write!(
                    f,
                    "[aucache::IndexError] Index {} is out of bounds for a corpus of length {}.",
                    index, len
                )
            }
        }
    }
}

impl std::error::Error for AuError {}
