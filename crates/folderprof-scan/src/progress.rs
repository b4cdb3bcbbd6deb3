//! Scan progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Snapshot broadcast while the walk is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub files_scanned: u64,
    pub dirs_scanned: u64,
    pub bytes_scanned: u64,
    /// Entries that produced a warning.
    pub errors_count: u64,
    /// Last file recorded before the snapshot.
    pub current_path: PathBuf,
    pub elapsed: Duration,
}

/// Counters owned by the walking thread.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    started: Instant,
    current: ScanProgress,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            current: ScanProgress::default(),
        }
    }

    pub fn record_file(&mut self, size: u64) {
        self.current.files_scanned += 1;
        self.current.bytes_scanned += size;
    }

    pub fn record_dir(&mut self) {
        self.current.dirs_scanned += 1;
    }

    pub fn record_error(&mut self) {
        self.current.errors_count += 1;
    }

    pub fn files_scanned(&self) -> u64 {
        self.current.files_scanned
    }

    pub fn snapshot(&self, current_path: PathBuf) -> ScanProgress {
        ScanProgress {
            current_path,
            elapsed: self.started.elapsed(),
            ..self.current.clone()
        }
    }
}
