//! File-name classification: temp files, build artifacts, manual versions.

use std::collections::HashSet;
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;

use folderprof_core::{AnalysisConfig, AnalysisError};

/// One trailing manual-version token, with its leading separator.
static VERSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:[\s._-]+(?:v\d+|version[\s._-]*\d+|copy(?:[\s._-]*\(\d+\))?|final|old|backup|\d+)|[\s._-]*\(\d+\))$",
    )
    .expect("valid version-token regex")
});

/// Compiled name patterns from the analysis configuration.
#[derive(Debug, Clone)]
pub struct PatternSet {
    temp: GlobSet,
    artifact_files: GlobSet,
    artifact_dirs: HashSet<String>,
}

impl PatternSet {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            temp: compile(&config.temp_patterns)?,
            artifact_files: compile(&config.artifact_file_patterns)?,
            artifact_dirs: config
                .artifact_dirs
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
        })
    }

    /// Name matches one of the temp globs.
    pub fn is_temp(&self, name: &str) -> bool {
        self.temp.is_match(name)
    }

    /// Name matches one of the loose artifact globs.
    pub fn is_artifact_file(&self, name: &str) -> bool {
        self.artifact_files.is_match(name)
    }

    /// Directory name is a known artifact directory.
    pub fn is_artifact_dir(&self, name: &str) -> bool {
        self.artifact_dirs.contains(&name.to_ascii_lowercase())
    }
}

fn compile(patterns: &[String]) -> Result<GlobSet, AnalysisError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|e| AnalysisError::invalid_config(format!("bad glob `{pattern}`: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AnalysisError::invalid_config(e.to_string()))
}

/// A file stem with its manual version tokens removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedStem {
    /// Lowercased stem without version tokens.
    pub base: String,
    /// Whether anything was stripped.
    pub has_token: bool,
}

/// Strip trailing version tokens (`_v2`, ` copy (2)`, `-final`, ` (1)`, ...).
///
/// A stem made only of tokens keeps its last one so that it never
/// normalises to an empty base.
pub fn split_version(stem: &str) -> VersionedStem {
    let mut base = stem.trim();
    let mut has_token = false;

    while let Some(m) = VERSION_TOKEN.find(base) {
        let rest = base[..m.start()].trim_end();
        if rest.is_empty() {
            break;
        }
        base = rest;
        has_token = true;
    }

    VersionedStem {
        base: base.to_lowercase(),
        has_token,
    }
}
