//! Scanned file tree container and statistics.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::ScanWarning;
use crate::record::{FileEntry, path_depth};

/// Summary statistics for a scanned tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total size in bytes.
    pub total_size: u64,
    /// Total number of files.
    pub total_files: u64,
    /// Total number of directories.
    pub total_dirs: u64,
    /// Maximum depth reached.
    pub max_depth: u32,
}

impl TreeStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a file entry.
    pub fn record_file(&mut self, size: u64, depth: u32) {
        self.total_files += 1;
        self.total_size += size;
        self.max_depth = self.max_depth.max(depth);
    }

    /// Record a directory.
    pub fn record_dir(&mut self, depth: u32) {
        self.total_dirs += 1;
        self.max_depth = self.max_depth.max(depth);
    }
}

/// The already-filtered file tree handed to the analysis pipeline.
///
/// Entries are regular files only; `directories` lists every directory the
/// scanner saw below the root (the root itself excluded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTree {
    /// Root path that was scanned.
    pub root_path: PathBuf,

    /// Regular files, in scanner order.
    pub entries: Vec<FileEntry>,

    /// Directories below the root.
    pub directories: Vec<PathBuf>,

    /// When this scan was performed.
    pub scanned_at: SystemTime,

    /// Duration of the scan.
    pub scan_duration: Duration,

    /// Summary statistics.
    pub stats: TreeStats,

    /// Warnings encountered during scan.
    pub warnings: Vec<ScanWarning>,
}

impl FileTree {
    /// Create a new file tree.
    pub fn new(
        root_path: PathBuf,
        entries: Vec<FileEntry>,
        directories: Vec<PathBuf>,
        stats: TreeStats,
        scan_duration: Duration,
        warnings: Vec<ScanWarning>,
    ) -> Self {
        Self {
            root_path,
            entries,
            directories,
            scanned_at: SystemTime::now(),
            scan_duration,
            stats,
            warnings,
        }
    }

    /// Build a tree from bare entries, as an external scanner would hand them over.
    ///
    /// Statistics are derived from the entries; no directories are listed.
    pub fn from_entries(root_path: impl Into<PathBuf>, entries: Vec<FileEntry>) -> Self {
        let root_path = root_path.into();
        let mut stats = TreeStats::new();
        for entry in &entries {
            stats.record_file(entry.size, path_depth(&root_path, &entry.path));
        }
        Self::new(
            root_path,
            entries,
            Vec::new(),
            stats,
            Duration::ZERO,
            Vec::new(),
        )
    }

    /// Get the total size of the tree.
    pub fn total_size(&self) -> u64 {
        self.stats.total_size
    }

    /// Get the total number of files.
    pub fn total_files(&self) -> u64 {
        self.stats.total_files
    }

    /// Check if the tree holds no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
