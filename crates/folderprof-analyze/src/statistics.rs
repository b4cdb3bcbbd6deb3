//! Aggregate statistics over the analyzed files.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use folderprof_core::{FileRecord, path_depth};

/// Largest files listed in the statistics.
const LARGEST_FILES: usize = 10;

/// Count and bytes for one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionStats {
    /// Lowercased extension, or empty for files without one.
    pub extension: String,
    pub count: u64,
    pub bytes: u64,
}

/// Summary of the analyzed file set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatistics {
    /// Files that were fingerprinted successfully.
    pub total_files: u64,
    /// Bytes in those files.
    pub total_bytes: u64,
    /// Directories below the root.
    pub total_directories: u64,
    /// Deepest file or directory.
    pub max_depth: u32,
    /// Mean file size in bytes, rounded down.
    pub average_file_size: u64,
    /// Per-extension totals, largest byte count first.
    pub extensions: Vec<ExtensionStats>,
    /// Largest files, biggest first.
    pub largest_files: Vec<(PathBuf, u64)>,
    /// Files whose directory lies deeper than the nesting threshold.
    pub deep_files: u64,
    /// Files that could not be read.
    pub errored_files: u64,
}

impl ScanStatistics {
    /// Compute statistics for `records` below `root`.
    pub fn compute(
        root: &Path,
        records: &[FileRecord],
        directories: &BTreeSet<PathBuf>,
        max_depth: u32,
        errored_files: u64,
    ) -> Self {
        let total_files = records.len() as u64;
        let total_bytes: u64 = records.iter().map(|r| r.size).sum();

        let mut by_extension: HashMap<String, (u64, u64)> = HashMap::new();
        for record in records {
            let entry = by_extension
                .entry(record.extension().unwrap_or_default())
                .or_default();
            entry.0 += 1;
            entry.1 += record.size;
        }
        let mut extensions: Vec<ExtensionStats> = by_extension
            .into_iter()
            .map(|(extension, (count, bytes))| ExtensionStats {
                extension,
                count,
                bytes,
            })
            .collect();
        extensions.sort_by(|a, b| {
            b.bytes
                .cmp(&a.bytes)
                .then_with(|| a.extension.cmp(&b.extension))
        });

        let mut largest: Vec<&FileRecord> = records.iter().collect();
        largest.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        let largest_files = largest
            .into_iter()
            .take(LARGEST_FILES)
            .map(|r| (r.path.clone(), r.size))
            .collect();

        let file_depth = records.iter().map(|r| r.depth).max().unwrap_or(0);
        let dir_depth = directories
            .iter()
            .map(|d| path_depth(root, d))
            .max()
            .unwrap_or(0);

        Self {
            total_files,
            total_bytes,
            total_directories: directories.len() as u64,
            max_depth: file_depth.max(dir_depth),
            average_file_size: total_bytes.checked_div(total_files).unwrap_or(0),
            extensions,
            largest_files,
            deep_files: records
                .iter()
                .filter(|r| r.parent_depth() > max_depth)
                .count() as u64,
            errored_files,
        }
    }

    /// Share of files whose directory is too deep.
    pub fn deep_file_ratio(&self) -> f64 {
        ratio(self.deep_files, self.total_files)
    }
}

/// `part / whole`, or 0 for an empty whole.
pub(crate) fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Every directory strictly below `root`: the scanner's list plus the
/// ancestors of each file.
pub fn directory_set(
    root: &Path,
    scanned: &[PathBuf],
    records: &[FileRecord],
) -> BTreeSet<PathBuf> {
    let mut directories: BTreeSet<PathBuf> = scanned
        .iter()
        .filter(|d| d.starts_with(root) && d.as_path() != root)
        .cloned()
        .collect();

    for record in records {
        for ancestor in record.path.ancestors().skip(1) {
            if ancestor == root || !ancestor.starts_with(root) {
                break;
            }
            directories.insert(ancestor.to_path_buf());
        }
    }
    directories
}
