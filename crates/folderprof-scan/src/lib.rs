//! File system scanning front-end for folderprof.
//!
//! This crate walks a directory in parallel using jwalk and hands the
//! analysis pipeline a flat, already-filtered [`FileTree`] of regular files.
//!
//! # Overview
//!
//! - **Parallel traversal** via jwalk/rayon, sorted by name for stable output
//! - **Ignore patterns** in gitignore-like glob syntax, from config or a file
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use folderprof_scan::{JwalkScanner, ScanConfig};
//!
//! let config = ScanConfig::new("/path/to/scan");
//! let scanner = JwalkScanner::new();
//! let tree = scanner.scan(&config).unwrap();
//!
//! println!("Total size: {} bytes", tree.total_size());
//! println!("Total files: {}", tree.total_files());
//! ```

mod ignore;
mod progress;
mod scanner;

pub use ignore::IgnoreMatcher;
pub use progress::ScanProgress;
pub use scanner::{JwalkScanner, relative_paths};

// Re-export core types for convenience
pub use folderprof_core::{
    FileEntry, FileTree, ScanConfig, ScanError, ScanWarning, TreeStats, WarningKind,
};
