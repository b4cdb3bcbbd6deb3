//! JWalk-based parallel directory scanner.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, UNIX_EPOCH};

use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;

use folderprof_core::{
    FileEntry, FileTree, ScanConfig, ScanError, ScanWarning, TreeStats, WarningKind,
};

use crate::ignore::IgnoreMatcher;
use crate::progress::{ProgressTracker, ScanProgress};

/// Files between two progress broadcasts.
const PROGRESS_INTERVAL: u64 = 1000;

/// Scanner producing the flat, already-filtered [`FileTree`] the analyzer consumes.
pub struct JwalkScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl JwalkScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Perform a scan of the given path.
    ///
    /// Only regular files become entries. Symbolic links are skipped, ignored
    /// directories are pruned without descending, and unreadable entries are
    /// recorded as warnings.
    pub fn scan(&self, config: &ScanConfig) -> Result<FileTree, ScanError> {
        let start = Instant::now();
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let matcher = Arc::new(build_matcher(config)?);

        let mut stats = TreeStats::new();
        let mut warnings = Vec::new();
        let mut entries = Vec::new();
        let mut directories = Vec::new();
        let mut tracker = ProgressTracker::new();

        let parallelism = match config.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: std::time::Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let prune_root = root_path.clone();
        let prune_matcher = Arc::clone(&matcher);
        let walker = WalkDir::new(&root_path)
            .parallelism(parallelism)
            .sort(true)
            .skip_hidden(!config.include_hidden)
            .follow_links(config.follow_symlinks)
            .min_depth(0)
            .max_depth(config.max_depth.map(|d| d as usize).unwrap_or(usize::MAX))
            .process_read_dir(move |_depth, _path, _state, children| {
                if prune_matcher.is_empty() {
                    return;
                }
                children.retain(|child| match child {
                    Ok(entry) => !prune_matcher.is_ignored(
                        &prune_root,
                        &entry.path(),
                        entry.file_type().is_dir(),
                    ),
                    Err(_) => true,
                });
            });

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let warning = match err.io_error() {
                        Some(io) => ScanWarning::from_io(path, io),
                        None => ScanWarning::new(path, err.to_string(), WarningKind::ReadError),
                    };
                    tracing::debug!(path = %warning.path.display(), "walk error: {}", warning.message);
                    tracker.record_error();
                    warnings.push(warning);
                    continue;
                }
            };

            let depth = entry.depth() as u32;
            if depth == 0 {
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                stats.record_dir(depth);
                tracker.record_dir();
                directories.push(path);
            } else if file_type.is_file() {
                let metadata = match entry.metadata() {
                    Ok(m) => m,
                    Err(err) => {
                        tracker.record_error();
                        warnings.push(ScanWarning::new(
                            &path,
                            err.to_string(),
                            WarningKind::MetadataError,
                        ));
                        continue;
                    }
                };

                let size = metadata.len();
                let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
                stats.record_file(size, depth);
                tracker.record_file(size);

                if tracker.files_scanned() % PROGRESS_INTERVAL == 0 {
                    let _ = self.progress_tx.send(tracker.snapshot(path.clone()));
                }

                entries.push(FileEntry::new(path, size, modified));
            } else {
                tracing::trace!(path = %path.display(), "skipping non-regular entry");
            }
        }

        let _ = self.progress_tx.send(tracker.snapshot(root_path.clone()));
        tracing::info!(
            root = %root_path.display(),
            files = stats.total_files,
            dirs = stats.total_dirs,
            warnings = warnings.len(),
            "scan complete"
        );

        Ok(FileTree::new(
            root_path,
            entries,
            directories,
            stats,
            start.elapsed(),
            warnings,
        ))
    }
}

impl Default for JwalkScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn build_matcher(config: &ScanConfig) -> Result<IgnoreMatcher, ScanError> {
    let mut patterns: Vec<String> = config.ignore_patterns.clone();
    if let Some(ref file) = config.ignore_file {
        patterns.extend(IgnoreMatcher::read_patterns(file)?);
    }
    IgnoreMatcher::new(&patterns)
}

/// Paths of all entries, relative to the root, for diagnostics and tests.
pub fn relative_paths(tree: &FileTree) -> Vec<PathBuf> {
    tree.entries
        .iter()
        .filter_map(|e| e.path.strip_prefix(&tree.root_path).ok())
        .map(Path::to_path_buf)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();

        temp
    }

    #[test]
    fn test_basic_scan() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());

        let tree = JwalkScanner::new().scan(&config).unwrap();

        assert_eq!(tree.stats.total_files, 4);
        assert_eq!(tree.stats.total_dirs, 3);
        assert_eq!(tree.directories.len(), 3);
        assert_eq!(tree.total_size(), 5 + 17 + 4 + 17);
        assert_eq!(tree.stats.max_depth, 3);
    }

    #[test]
    fn test_final_progress_snapshot() {
        let temp = create_test_tree();
        let scanner = JwalkScanner::new();
        let mut rx = scanner.subscribe();

        scanner.scan(&ScanConfig::new(temp.path())).unwrap();

        let mut last = None;
        while let Ok(progress) = rx.try_recv() {
            last = Some(progress);
        }
        let last = last.unwrap();
        assert_eq!(last.files_scanned, 4);
        assert_eq!(last.dirs_scanned, 3);
        assert_eq!(last.bytes_scanned, 5 + 17 + 4 + 17);
        assert_eq!(last.errors_count, 0);
    }

    #[test]
    fn test_entries_are_sorted_and_deterministic() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path());
        let scanner = JwalkScanner::new();

        let first = relative_paths(&scanner.scan(&config).unwrap());
        let second = relative_paths(&scanner.scan(&config).unwrap());
        assert_eq!(first, second);
        assert!(first.contains(&PathBuf::from("dir1/subdir/file3.txt")));
    }

    #[test]
    fn test_ignore_patterns_prune_directories() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .ignore_patterns(vec!["dir2".to_string()])
            .build()
            .unwrap();

        let tree = JwalkScanner::new().scan(&config).unwrap();

        assert_eq!(tree.total_files(), 3);
        assert!(!tree.directories.iter().any(|d| d.ends_with("dir2")));
        assert!(!relative_paths(&tree).contains(&PathBuf::from("dir2/file4.txt")));
    }

    #[test]
    fn test_ignore_file() {
        let temp = create_test_tree();
        let ignore = temp.path().join(".folderprofignore");
        fs::write(&ignore, "# generated\n*.txt\n").unwrap();

        let config = ScanConfig::builder()
            .root(temp.path())
            .ignore_file(Some(ignore))
            .build()
            .unwrap();

        let tree = JwalkScanner::new().scan(&config).unwrap();
        assert_eq!(
            relative_paths(&tree),
            vec![PathBuf::from(".folderprofignore")]
        );
    }

    #[test]
    fn test_hidden_files_skipped() {
        let temp = create_test_tree();
        fs::write(temp.path().join(".hidden"), "x").unwrap();

        let config = ScanConfig::builder()
            .root(temp.path())
            .include_hidden(false)
            .build()
            .unwrap();

        let tree = JwalkScanner::new().scan(&config).unwrap();
        assert_eq!(tree.total_files(), 4);
    }

    #[test]
    fn test_max_depth() {
        let temp = create_test_tree();
        let config = ScanConfig::builder()
            .root(temp.path())
            .max_depth(Some(1u32))
            .build()
            .unwrap();

        let tree = JwalkScanner::new().scan(&config).unwrap();
        assert_eq!(relative_paths(&tree), vec![PathBuf::from("file1.txt")]);
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp = create_test_tree();
        let config = ScanConfig::new(temp.path().join("file1.txt"));

        assert!(matches!(
            JwalkScanner::new().scan(&config),
            Err(ScanError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let config = ScanConfig::new(temp.path().join("nope"));

        assert!(matches!(
            JwalkScanner::new().scan(&config),
            Err(ScanError::NotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(
            temp.path().join("file1.txt"),
            temp.path().join("link.txt"),
        )
        .unwrap();

        let tree = JwalkScanner::new().scan(&ScanConfig::new(temp.path())).unwrap();
        assert_eq!(tree.total_files(), 4);
    }
}
