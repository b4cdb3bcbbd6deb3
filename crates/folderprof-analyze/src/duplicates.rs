//! Exact-duplicate grouping over fingerprinted records.
//!
//! Records are grouped by their BLAKE3 content hash. Each group designates a
//! keeper (shallowest depth, then smallest path); everything else in the
//! group is redundant.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use folderprof_core::{ContentHash, FileRecord};

/// A group of duplicate files sharing the same content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,

    /// Size of each file in bytes.
    pub size: u64,

    /// Paths to all duplicate files, keeper first, the rest by (depth, path).
    pub paths: Vec<PathBuf>,

    /// Wasted space: size * (count - 1).
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    /// The copy to retain.
    pub fn keeper(&self) -> &Path {
        &self.paths[0]
    }

    /// Every member except the keeper.
    pub fn redundant(&self) -> &[PathBuf] {
        &self.paths[1..]
    }

    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Check if keeping one file, how many could be deleted.
    pub fn deletable_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Sum of all member sizes.
    pub fn total_size(&self) -> u64 {
        self.size * self.paths.len() as u64
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups ranked by wasted space, member count, then keeper path.
    pub groups: Vec<DuplicateGroup>,

    /// Total size of all duplicate files.
    pub total_duplicate_size: u64,

    /// Total wasted space (could be reclaimed).
    pub total_wasted_space: u64,

    /// Number of files analyzed.
    pub files_analyzed: u64,

    /// Number of files that have duplicates.
    pub files_with_duplicates: u64,

    /// Number of unique duplicate groups.
    pub group_count: usize,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Get total number of duplicate files across all groups.
    pub fn total_duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.paths.len()).sum()
    }

    /// Group containing `path`, if any.
    pub fn group_of(&self, path: &Path) -> Option<&DuplicateGroup> {
        self.groups.iter().find(|g| g.paths.iter().any(|p| p == path))
    }
}

/// Partitions records into exact-duplicate groups.
#[derive(Debug, Default)]
pub struct DuplicateGrouper;

impl DuplicateGrouper {
    pub fn new() -> Self {
        Self
    }

    /// Group records by content hash.
    ///
    /// Records without a hash (errored) and zero-length files never group.
    pub fn group(&self, records: &[FileRecord]) -> DuplicateReport {
        let hashed: Vec<(ContentHash, &FileRecord)> = records
            .iter()
            .filter(|r| r.size > 0)
            .filter_map(|r| r.content_hash.map(|h| (h, r)))
            .collect();
        let files_analyzed = hashed.len() as u64;

        let mut groups: Vec<DuplicateGroup> = hashed
            .into_iter()
            .into_group_map()
            .into_iter()
            .filter(|(_, members)| members.len() >= 2)
            .map(|(hash, mut members)| {
                members.sort_by(|a, b| a.keeper_order(b));
                let size = members[0].size;
                let paths: Vec<PathBuf> = members.iter().map(|r| r.path.clone()).collect();
                let wasted_bytes = size * (paths.len() as u64 - 1);
                DuplicateGroup {
                    hash,
                    size,
                    paths,
                    wasted_bytes,
                }
            })
            .collect();

        groups.sort_by(|a, b| {
            b.wasted_bytes
                .cmp(&a.wasted_bytes)
                .then_with(|| b.count().cmp(&a.count()))
                .then_with(|| a.keeper().cmp(b.keeper()))
        });

        let total_duplicate_size: u64 = groups.iter().map(DuplicateGroup::total_size).sum();
        let total_wasted_space: u64 = groups.iter().map(|g| g.wasted_bytes).sum();
        let files_with_duplicates: u64 = groups.iter().map(|g| g.paths.len() as u64).sum();
        let group_count = groups.len();

        tracing::debug!(group_count, total_wasted_space, "duplicate grouping done");

        DuplicateReport {
            groups,
            total_duplicate_size,
            total_wasted_space,
            files_analyzed,
            files_with_duplicates,
            group_count,
        }
    }
}
