// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constant;
use crate::error::AuError;
use crate::store::{ArtifactKind, ArtifactStore};
use crate::ut;

/// Action unit intensities of one subject at one frame
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use aucache_core::labels::LabelRecord;
///
/// let record = LabelRecord {
///     subject: "SN001".to_string(),
///     frame: 0,
///     action_units: BTreeMap::from([("AU1".to_string(), 2), ("AU12".to_string(), 0)]),
/// };
///
/// assert_eq!(record.intensity("AU1"), Some(2));
/// assert_eq!(record.intensity("AU4"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub subject: String,
    pub frame: usize,
    pub action_units: BTreeMap<String, i32>,
}

impl LabelRecord {
    pub fn intensity(&self, unit: &str) -> Option<i32> {
        self.action_units.get(unit).copied()
    }

    /// Read a label record from a .json file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path)
            .map_err(|err| AuError::LabelReadError(format!("{}: {}", path.display(), err)))?;

        serde_json::from_slice(&bytes)
            .map_err(|err| AuError::LabelReadError(format!("{}: {}", path.display(), err)))
    }

    /// Write a label record as .json
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AuError> {
        let path = path.as_ref();

        let bytes = serde_json::to_vec(self)
            .map_err(|err| AuError::LabelWriteError(format!("{}: {}", path.display(), err)))?;

        ut::path::write_atomic(path, &bytes)
            .map_err(|err| AuError::LabelWriteError(format!("{}: {}", path.display(), err)))
    }
}

/// Sort key placing `AU2` before `AU12`; names without a number go last
fn unit_order(unit: &str) -> (u32, String) {
    let digits: String = unit
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    (digits.parse().unwrap_or(u32::MAX), unit.to_string())
}

/// Per-unit label files of a subject ordered by action unit number
///
/// Files are named `<subject>_<unit>.txt`; the unit name is the stem with
/// the subject prefix removed.
///
/// # Arguments
///
/// * `subject` - Subject identifier
/// * `directory` - The subject's label directory
pub fn unit_files<P: AsRef<Path>>(
    subject: &str,
    directory: P,
) -> Result<Vec<(String, PathBuf)>, AuError> {
    let directory = directory.as_ref();

    let files = ut::path::collect_sorted_files(directory, &[constant::RAW_LABEL_EXTENSION])
        .map_err(|err| AuError::LabelReadError(err.to_string()))?;

    if files.is_empty() {
        return Err(AuError::LabelReadError(format!(
            "No action unit files found in {}",
            directory.display()
        )));
    }

    let prefix = format!("{}_", subject);
    let mut units: Vec<(String, PathBuf)> = files
        .into_iter()
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let unit = stem.strip_prefix(&prefix).unwrap_or(stem).to_string();
            Some((unit, path))
        })
        .collect();

    units.sort_by_cached_key(|(unit, _)| unit_order(unit));

    Ok(units)
}

/// Intensity column of one per-unit label file
///
/// Every non-empty line has the form `<anything>,<integer intensity>`.
pub fn read_intensities<P: AsRef<Path>>(path: P) -> Result<Vec<i32>, AuError> {
    let path = path.as_ref();

    let contents = std::fs::read_to_string(path)
        .map_err(|err| AuError::LabelReadError(format!("{}: {}", path.display(), err)))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            line.split(',')
                .nth(1)
                .and_then(|value| value.trim().parse::<i32>().ok())
                .ok_or_else(|| AuError::LabelParseError {
                    path: path.display().to_string(),
                    line: idx + 1,
                })
        })
        .collect()
}

/// Zip per-unit intensity columns into one record per frame
///
/// Every unit must have the same number of frames. Unequal lengths are
/// an error rather than a silent truncation to the shortest unit.
///
/// # Arguments
///
/// * `subject` - Subject identifier stored in each record
/// * `units` - Unit names and their intensity columns
pub fn zip_units(subject: &str, units: Vec<(String, Vec<i32>)>) -> Result<Vec<LabelRecord>, AuError> {
    let Some(expected) = units.first().map(|(_, values)| values.len()) else {
        return Ok(vec![]);
    };

    if let Some((unit, values)) = units.iter().find(|(_, values)| values.len() != expected) {
        return Err(AuError::LabelLengthMismatch {
            subject: subject.to_string(),
            unit: unit.clone(),
            expected,
            found: values.len(),
        });
    }

    Ok((0..expected)
        .map(|frame| LabelRecord {
            subject: subject.to_string(),
            frame,
            action_units: units
                .iter()
                .map(|(unit, values)| (unit.clone(), values[frame]))
                .collect(),
        })
        .collect())
}

/// Converts raw per-unit label files into per-frame label records
pub struct LabelAligner<'a> {
    store: &'a ArtifactStore,
}

impl<'a> LabelAligner<'a> {
    pub fn new(store: &'a ArtifactStore) -> Self {
        Self { store }
    }

    /// Read and align the label files of a subject without writing
    ///
    /// # Arguments
    ///
    /// * `subject` - Subject identifier
    /// * `directory` - The subject's label directory
    pub fn align<P: AsRef<Path>>(
        &self,
        subject: &str,
        directory: P,
    ) -> Result<Vec<LabelRecord>, AuError> {
        let units = unit_files(subject, directory)?
            .into_iter()
            .map(|(unit, path)| Ok((unit, read_intensities(&path)?)))
            .collect::<Result<Vec<_>, AuError>>()?;

        zip_units(subject, units)
    }

    /// Align a subject's labels and persist records not yet on disk
    ///
    /// Returns the number of label records (frames) of the subject.
    pub fn process<P: AsRef<Path>>(&self, subject: &str, directory: P) -> Result<usize, AuError> {
        let records = self.align(subject, directory)?;

        for record in records.iter() {
            let path = self.store.path_for(subject, ArtifactKind::Label, record.frame);
            if !path.exists() {
                record.save(path)?;
            }
        }

        Ok(records.len())
    }
}
