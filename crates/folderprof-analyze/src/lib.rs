//! Analysis pipeline for folderprof.
//!
//! This crate turns a scanned [`FileTree`] into an [`AnalysisReport`]:
//!
//! - **Fingerprinting** - BLAKE3 content hash, MinHash signature for text,
//!   gradient perceptual hash for images, all from a single streamed read
//! - **Duplicate grouping** - exact duplicates by content hash, with a keeper
//!   per group and the wasted bytes
//! - **Similarity clustering** - near-duplicates via MinHash banding (LSH)
//!   and a BK-tree over perceptual hashes, joined with union-find
//! - **Recommendations** - duplicate, temp file, build artifact, deep nesting
//!   and manual versioning cleanups, ordered by priority
//! - **Health scoring** - five weighted dimensions folded into a 0-100 score
//!
//! ```rust,ignore
//! use folderprof_analyze::Analyzer;
//! use folderprof_core::AnalysisConfig;
//! use folderprof_scan::{JwalkScanner, ScanConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let tree = JwalkScanner::new().scan(&ScanConfig::new("/path/to/scan"))?;
//! let analyzer = Analyzer::new(AnalysisConfig::default())?;
//! let report = analyzer.analyze(&tree, &CancellationToken::new())?;
//!
//! println!("Health: {} ({})", report.health.overall, report.health.bucket);
//! for rec in &report.recommendations {
//!     println!("[{}] {}", rec.priority, rec.title);
//! }
//! ```

mod analyzer;
mod duplicates;
pub mod fingerprint;
mod health;
pub mod patterns;
mod recommend;
pub mod similarity;
mod statistics;

pub use analyzer::{AnalysisReport, AnalysisStatus, Analyzer};
pub use duplicates::{DuplicateGroup, DuplicateGrouper, DuplicateReport};
pub use fingerprint::{
    FingerprintCache, FingerprintProgress, FingerprintRun, Fingerprinter, MemoryCache,
};
pub use health::{HealthBucket, HealthInputs, HealthScore, HealthScorer};
pub use patterns::{PatternSet, VersionedStem, split_version};
pub use recommend::{
    Priority, Recommendation, RecommendationEngine, RecommendationKind, RuleContext,
    SuggestedAction,
};
pub use similarity::{SignatureKind, SimilarityCluster, SimilarityClusterer};
pub use statistics::{ExtensionStats, ScanStatistics, directory_set};

// Re-export core types
pub use folderprof_core::{AnalysisConfig, AnalysisError, FileError, FileRecord, FileTree};
