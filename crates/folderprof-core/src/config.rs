//! Scan and analysis configuration types.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use derive_builder::Builder;
use globset::Glob;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::record::PerceptualHash;

/// File-name globs conventionally used for transient files.
pub const DEFAULT_TEMP_PATTERNS: &[&str] = &[
    "*.tmp",
    "*.temp",
    "*.bak",
    "*.swp",
    "*.swo",
    "*~",
    "~$*",
    ".~lock.*",
    "*.crdownload",
    "*.part",
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
];

/// Directory names holding generated, reproducible output.
pub const DEFAULT_ARTIFACT_DIRS: &[&str] = &[
    "target",
    "node_modules",
    "__pycache__",
    "build",
    "dist",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".gradle",
    ".next",
    ".nuxt",
    ".parcel-cache",
    ".cache",
];

/// File-name globs for compiled output that can live anywhere.
pub const DEFAULT_ARTIFACT_FILE_PATTERNS: &[&str] = &["*.pyc", "*.pyo", "*.o", "*.obj", "*.class"];

/// Configuration for scanning operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Maximum depth to traverse (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Patterns to ignore (gitignore-like glob syntax).
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// File with additional ignore patterns, one per line.
    #[builder(default)]
    #[serde(default)]
    pub ignore_file: Option<PathBuf>,

    /// Number of threads for scanning (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            max_depth: None,
            ignore_patterns: Vec::new(),
            ignore_file: None,
            threads: 0,
            include_hidden: true,
        }
    }

    /// Check if hidden files should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Immutable configuration for one analysis run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct AnalysisConfig {
    /// Minimum similarity for two files to count as near-duplicates.
    #[builder(default = "0.85")]
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Files larger than this never get a similarity signature.
    #[builder(default = "32 * 1024 * 1024")]
    #[serde(default = "default_max_signature_size")]
    pub max_signature_size: u64,

    /// Read buffer size for streaming fingerprinting.
    #[builder(default = "64 * 1024")]
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of MinHash functions (k).
    #[builder(default = "128")]
    #[serde(default = "default_signature_length")]
    pub signature_length: usize,

    /// Number of LSH bands (b); must divide `signature_length`.
    #[builder(default = "16")]
    #[serde(default = "default_lsh_bands")]
    pub lsh_bands: usize,

    /// Tokens per shingle.
    #[builder(default = "3")]
    #[serde(default = "default_shingle_size")]
    pub shingle_size: usize,

    /// Minimum age before a temp file is recommended for cleanup.
    #[builder(default = "Duration::from_secs(7 * 24 * 60 * 60)")]
    #[serde(default = "default_temp_file_age")]
    pub temp_file_age: Duration,

    /// Directories deeper than this trigger a nesting warning.
    #[builder(default = "10")]
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Reference time for age calculations (default: now).
    #[builder(default = "SystemTime::now()")]
    #[serde(default = "SystemTime::now")]
    pub reference_time: SystemTime,

    /// Number of fingerprinting workers (0 = one per CPU).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Duplicate groups beyond this count are folded into one recommendation.
    #[builder(default = "50")]
    #[serde(default = "default_max_duplicate_recommendations")]
    pub max_duplicate_recommendations: usize,

    /// Globs for transient file names.
    #[builder(default = "to_strings(DEFAULT_TEMP_PATTERNS)")]
    #[serde(default = "default_temp_patterns")]
    pub temp_patterns: Vec<String>,

    /// Directory names of generated output.
    #[builder(default = "to_strings(DEFAULT_ARTIFACT_DIRS)")]
    #[serde(default = "default_artifact_dirs")]
    pub artifact_dirs: Vec<String>,

    /// Globs for generated files outside artifact directories.
    #[builder(default = "to_strings(DEFAULT_ARTIFACT_FILE_PATTERNS)")]
    #[serde(default = "default_artifact_file_patterns")]
    pub artifact_file_patterns: Vec<String>,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_max_signature_size() -> u64 {
    32 * 1024 * 1024
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_signature_length() -> usize {
    128
}

fn default_lsh_bands() -> usize {
    16
}

fn default_shingle_size() -> usize {
    3
}

fn default_temp_file_age() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

fn default_max_depth() -> u32 {
    10
}

fn default_max_duplicate_recommendations() -> usize {
    50
}

fn default_temp_patterns() -> Vec<String> {
    to_strings(DEFAULT_TEMP_PATTERNS)
}

fn default_artifact_dirs() -> Vec<String> {
    to_strings(DEFAULT_ARTIFACT_DIRS)
}

fn default_artifact_file_patterns() -> Vec<String> {
    to_strings(DEFAULT_ARTIFACT_FILE_PATTERNS)
}

impl AnalysisConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(threshold) = self.similarity_threshold {
            check_threshold(threshold)?;
        }
        let length = self.signature_length.unwrap_or_else(default_signature_length);
        let bands = self.lsh_bands.unwrap_or_else(default_lsh_bands);
        check_banding(length, bands)
    }
}

fn check_threshold(threshold: f64) -> Result<(), String> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(format!(
            "similarity threshold must lie within [0, 1], got {threshold}"
        ));
    }
    Ok(())
}

fn check_banding(length: usize, bands: usize) -> Result<(), String> {
    if length == 0 {
        return Err("signature length must be positive".to_string());
    }
    if bands == 0 || length % bands != 0 {
        return Err(format!(
            "LSH band count {bands} must be positive and divide the signature length {length}"
        ));
    }
    Ok(())
}

impl AnalysisConfig {
    /// Create a new config builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Check every invariant the pipeline relies on.
    ///
    /// Called before any file is touched; a failure here is fatal.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        check_threshold(self.similarity_threshold).map_err(AnalysisError::invalid_config)?;
        check_banding(self.signature_length, self.lsh_bands)
            .map_err(AnalysisError::invalid_config)?;
        if self.shingle_size == 0 {
            return Err(AnalysisError::invalid_config(
                "shingle size must be positive",
            ));
        }
        if self.chunk_size == 0 {
            return Err(AnalysisError::invalid_config("chunk size must be positive"));
        }
        if self.max_depth == 0 {
            return Err(AnalysisError::invalid_config(
                "nesting depth threshold must be positive",
            ));
        }
        for pattern in self.temp_patterns.iter().chain(&self.artifact_file_patterns) {
            Glob::new(pattern).map_err(|e| {
                AnalysisError::invalid_config(format!("bad glob pattern `{pattern}`: {e}"))
            })?;
        }
        Ok(())
    }

    /// Rows per LSH band (r = k / b).
    pub fn rows_per_band(&self) -> usize {
        self.signature_length / self.lsh_bands.max(1)
    }

    /// Largest perceptual-hash Hamming distance still counted as similar.
    pub fn max_hamming_distance(&self) -> u32 {
        let bits = f64::from(PerceptualHash::BITS);
        ((1.0 - self.similarity_threshold) * bits).round() as u32
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            max_signature_size: default_max_signature_size(),
            chunk_size: default_chunk_size(),
            signature_length: default_signature_length(),
            lsh_bands: default_lsh_bands(),
            shingle_size: default_shingle_size(),
            temp_file_age: default_temp_file_age(),
            max_depth: default_max_depth(),
            reference_time: SystemTime::now(),
            threads: 0,
            max_duplicate_recommendations: default_max_duplicate_recommendations(),
            temp_patterns: default_temp_patterns(),
            artifact_dirs: default_artifact_dirs(),
            artifact_file_patterns: default_artifact_file_patterns(),
        }
    }
}
