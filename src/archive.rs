//! In-memory zip archive assembly for bulk exports.
//!
//! Entries are accumulated as `Bytes` under owner folders and written out in a
//! single pass by [`ArchiveWriter::serialize`], which reports percentage
//! progress after every entry.

use crate::error::Result;
use crate::storage::keys::sanitize_file_name;
use bytes::Bytes;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// Default deflate level: medium trade-off between CPU and size
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Entries at or above this size need zip64 headers
const ZIP64_THRESHOLD: usize = u32::MAX as usize;

/// Accumulates files and serializes them into one compressed archive
#[derive(Debug)]
pub struct ArchiveWriter {
    compression_level: i32,
    entries: Vec<(String, Bytes)>,
    paths: HashSet<String>,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl ArchiveWriter {
    /// Create an empty writer; `compression_level` is capped at 9
    pub fn new(compression_level: u32) -> Self {
        Self {
            compression_level: compression_level.min(9) as i32,
            entries: Vec::new(),
            paths: HashSet::new(),
        }
    }

    /// Add a file under `path`, returning the path actually used.
    ///
    /// A path already present gets a ` (n)` suffix before its extension.
    pub fn add_file(&mut self, path: &str, bytes: Bytes) -> String {
        let path = self.unique_path(path);
        self.paths.insert(path.clone());
        self.entries.push((path.clone(), bytes));
        path
    }

    /// Number of entries added so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry has been added
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total uncompressed size of all entries
    pub fn uncompressed_size(&self) -> u64 {
        self.entries.iter().map(|(_, b)| b.len() as u64).sum()
    }

    /// Write every entry into a zip archive.
    ///
    /// `on_progress` receives a non-decreasing percentage after each entry and
    /// always ends with 100.
    pub fn serialize(self, mut on_progress: impl FnMut(u8)) -> Result<Vec<u8>> {
        let total = self.entries.len();
        let base = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level))
            .unix_permissions(0o644);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for (index, (path, bytes)) in self.entries.into_iter().enumerate() {
            let options = base.large_file(bytes.len() >= ZIP64_THRESHOLD);
            zip.start_file(path.as_str(), options)?;
            zip.write_all(&bytes)?;

            let percent = ((index + 1) * 100 / total) as u8;
            on_progress(percent);
        }

        let bytes = zip.finish()?.into_inner();
        if total == 0 {
            on_progress(100);
        }

        debug!(entries = total, size = bytes.len(), "archive serialized");
        Ok(bytes)
    }

    fn unique_path(&self, path: &str) -> String {
        if !self.paths.contains(path) {
            return path.to_string();
        }

        let (dir, name) = match path.rfind('/') {
            Some(i) => path.split_at(i + 1),
            None => ("", path),
        };
        let (stem, ext) = match name.rfind('.') {
            Some(i) if i > 0 => name.split_at(i),
            _ => (name, ""),
        };

        (1..)
            .map(|n| format!("{dir}{stem} ({n}){ext}"))
            .find(|candidate| !self.paths.contains(candidate))
            .unwrap_or_else(|| path.to_string())
    }
}

/// Folder holding one owner's files: `<sanitized name>_<identifier local part>`
pub fn owner_folder(owner_display_name: &str, owner_identifier: &str) -> String {
    let local_part = owner_identifier
        .split('@')
        .next()
        .unwrap_or(owner_identifier);
    format!(
        "{}_{}",
        sanitize_file_name(owner_display_name.trim()),
        sanitize_file_name(local_part.trim())
    )
}

/// Entry path for one file inside its owner's folder
///
/// Path separators in the display name are flattened so every entry stays
/// exactly one level deep.
pub fn entry_path(owner_display_name: &str, owner_identifier: &str, display_name: &str) -> String {
    let flattened: String = display_name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let file_name = match flattened.as_str() {
        "" | "." | ".." => "file".to_string(),
        _ => flattened,
    };
    format!("{}/{}", owner_folder(owner_display_name, owner_identifier), file_name)
}

/// Deterministic archive name `<sanitized title>_submissions_<YYYY-MM-DD>.zip`
pub fn archive_file_name(title: &str, date: NaiveDate) -> String {
    format!(
        "{}_submissions_{}.zip",
        sanitize_file_name(title.trim()),
        date.format("%Y-%m-%d")
    )
}
