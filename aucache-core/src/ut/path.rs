// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AuError;

/// Collect file paths from a directory in sorted file name order
///
/// # Arguments
///
/// * `directory` - Path to directory containing files
/// * `valid_ext` - Only include files with one of these extensions
///
/// # Examples
///
/// ```no_run
/// use aucache_core::ut::path::collect_sorted_files;
/// let frames = collect_sorted_files("frames/", &["jpg", "png"]);
/// ```
pub fn collect_sorted_files<P: AsRef<Path>>(
    directory: P,
    valid_ext: &[&str],
) -> Result<Vec<PathBuf>, AuError> {
    let directory = directory.as_ref();

    let mut files: Vec<PathBuf> = std::fs::read_dir(directory)
        .map_err(|err| AuError::DirError(format!("{}: {}", directory.display(), err)))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| valid_ext.contains(&ext.to_lowercase().as_str()))
        })
        .collect();

    files.sort_unstable_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(files)
}

/// Collect the names of all sub-directories in sorted order
///
/// # Arguments
///
/// * `directory` - Path to a directory whose children name subjects
pub fn collect_sorted_dirs<P: AsRef<Path>>(directory: P) -> Result<Vec<String>, AuError> {
    let directory = directory.as_ref();

    let mut names: Vec<String> = std::fs::read_dir(directory)
        .map_err(|err| AuError::DirError(format!("{}: {}", directory.display(), err)))?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| !name.starts_with('.'))
        .collect();

    names.sort_unstable();

    Ok(names)
}

/// Write bytes to a temporary sibling and rename it into place
///
/// A reader never observes a partially written file at `path`, so an
/// interrupted run cannot leave behind an artifact that looks complete.
///
/// # Arguments
///
/// * `path` - Final destination of the file
/// * `bytes` - File contents
pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), std::io::Error> {
    let path = path.as_ref();

    let file_name = path.file_name().and_then(|s| s.to_str()).ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path must name a file")
    })?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut tmp = path.to_path_buf();
    tmp.set_file_name(format!("{}.tmp.{}.{}", file_name, std::process::id(), nanos));

    {
        let mut file = std::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })
}

/// Whether a file name was produced by `write_atomic` for a temp file
fn is_atomic_temporary(file_name: &str) -> bool {
    let mut parts = file_name.rsplitn(4, '.');

    let (Some(nanos), Some(pid), Some("tmp"), Some(stem)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    !stem.is_empty() && digits(pid) && digits(nanos)
}

/// Delete temp files left in a directory by an interrupted `write_atomic`
///
/// Returns the number of removed files. Must not run while another writer
/// is active in the same directory.
pub fn remove_stale_temporaries<P: AsRef<Path>>(directory: P) -> Result<usize, AuError> {
    let directory = directory.as_ref();

    let entries = std::fs::read_dir(directory)
        .map_err(|err| AuError::DirError(format!("{}: {}", directory.display(), err)))?;

    let mut removed = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        let stale = path.is_file()
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_atomic_temporary);

        if stale && std::fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }

    Ok(removed)
}
