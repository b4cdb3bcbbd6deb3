//! Core types for folderprof.
//!
//! This crate provides the data structures shared across the folderprof
//! workspace: scanned trees, fingerprinted file records, configuration, and
//! error types.

mod config;
mod error;
mod record;
mod tree;

pub use config::{
    AnalysisConfig, AnalysisConfigBuilder, DEFAULT_ARTIFACT_DIRS, DEFAULT_ARTIFACT_FILE_PATTERNS,
    DEFAULT_TEMP_PATTERNS, ScanConfig, ScanConfigBuilder,
};
pub use error::{AnalysisError, FileError, FileErrorKind, ScanError, ScanWarning, WarningKind};
pub use record::{
    CacheKey, ContentHash, ContentKind, ContentType, FileEntry, FileRecord, Fingerprint,
    MinHashSignature, PerceptualHash, Signature, path_depth,
};
pub use tree::{FileTree, TreeStats};
