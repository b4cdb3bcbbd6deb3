//! Gitignore-like ignore patterns.

use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use folderprof_core::ScanError;

/// Compiled ignore patterns.
///
/// A pattern matches an entry's name or its path relative to the scan root.
/// Patterns ending in `/` only match directories. Blank lines and `#`
/// comments are skipped; negated (`!`) patterns are not supported and are
/// dropped.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    any: GlobSet,
    dirs_only: GlobSet,
}

impl IgnoreMatcher {
    /// Compile a list of patterns.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ScanError> {
        let mut any = GlobSetBuilder::new();
        let mut dirs_only = GlobSetBuilder::new();

        for raw in patterns {
            let pattern = raw.as_ref().trim();
            if pattern.is_empty() || pattern.starts_with('#') {
                continue;
            }
            if pattern.starts_with('!') {
                tracing::debug!(pattern, "negated ignore pattern dropped");
                continue;
            }

            let (pattern, builder) = match pattern.strip_suffix('/') {
                Some(dir) => (dir, &mut dirs_only),
                None => (pattern, &mut any),
            };
            let pattern = pattern.trim_start_matches('/');
            let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidConfig {
                message: format!("bad ignore pattern `{pattern}`: {e}"),
            })?;
            builder.add(glob);
        }

        let build = |builder: GlobSetBuilder| {
            builder.build().map_err(|e| ScanError::InvalidConfig {
                message: e.to_string(),
            })
        };

        Ok(Self {
            any: build(any)?,
            dirs_only: build(dirs_only)?,
        })
    }

    /// Matcher that ignores nothing.
    pub fn empty() -> Self {
        Self {
            any: GlobSet::empty(),
            dirs_only: GlobSet::empty(),
        }
    }

    /// Read patterns from an ignore file, one per line.
    pub fn read_patterns(path: &Path) -> Result<Vec<String>, ScanError> {
        let content = fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect())
    }

    /// Check whether an entry should be skipped.
    pub fn is_ignored(&self, root: &Path, path: &Path, is_dir: bool) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let name = path.file_name().map(Path::new).unwrap_or(relative);

        if self.any.is_match(name) || self.any.is_match(relative) {
            return true;
        }
        is_dir && (self.dirs_only.is_match(name) || self.dirs_only.is_match(relative))
    }

    /// Check whether no patterns were compiled.
    pub fn is_empty(&self) -> bool {
        self.any.is_empty() && self.dirs_only.is_empty()
    }
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_relative_matching() {
        let matcher = IgnoreMatcher::new(&["*.log", "docs/drafts"]).unwrap();
        let root = Path::new("/scan");

        assert!(matcher.is_ignored(root, Path::new("/scan/a/server.log"), false));
        assert!(matcher.is_ignored(root, Path::new("/scan/docs/drafts"), true));
        assert!(!matcher.is_ignored(root, Path::new("/scan/notes.txt"), false));
    }

    #[test]
    fn test_directory_only_patterns() {
        let matcher = IgnoreMatcher::new(&["cache/"]).unwrap();
        let root = Path::new("/scan");

        assert!(matcher.is_ignored(root, Path::new("/scan/cache"), true));
        assert!(!matcher.is_ignored(root, Path::new("/scan/cache"), false));
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let matcher = IgnoreMatcher::new(&["", "# comment", "!keep.txt"]).unwrap();
        assert!(matcher.is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            IgnoreMatcher::new(&["[oops"]),
            Err(ScanError::InvalidConfig { .. })
        ));
    }
}
