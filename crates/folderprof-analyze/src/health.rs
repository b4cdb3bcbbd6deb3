//! Folder health scoring.
//!
//! Five dimensions are each scored `100 * (1 - min(1, ratio * scale))` and
//! combined with fixed weights into an overall 0-100 value.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::duplicates::DuplicateReport;
use crate::recommend::{Recommendation, RecommendationKind};
use crate::statistics::{ScanStatistics, ratio};

/// (scale, weight) per dimension.
const DUPLICATION: (f64, f64) = (2.0, 0.30);
const ORGANIZATION: (f64, f64) = (2.0, 0.20);
const NAMING: (f64, f64) = (3.0, 0.15);
const DEPTH: (f64, f64) = (2.0, 0.15);
const TEMP: (f64, f64) = (5.0, 0.20);

/// Coarse label for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
pub enum HealthBucket {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthBucket {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => HealthBucket::Excellent,
            s if s >= 75.0 => HealthBucket::Good,
            s if s >= 55.0 => HealthBucket::Fair,
            s if s >= 35.0 => HealthBucket::Poor,
            _ => HealthBucket::Critical,
        }
    }

    /// One-line verdict for reports.
    pub fn summary(&self) -> &'static str {
        match self {
            HealthBucket::Excellent => "The folder is well organized with little to clean up.",
            HealthBucket::Good => "The folder is in good shape with a few cleanup opportunities.",
            HealthBucket::Fair => "The folder has noticeable clutter that is worth addressing.",
            HealthBucket::Poor => "The folder carries significant redundancy and disorganization.",
            HealthBucket::Critical => "The folder needs urgent cleanup.",
        }
    }
}

/// Overall score plus the five dimension scores, each in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    /// Weighted sum, rounded to one decimal.
    pub overall: f64,
    pub duplication: f64,
    pub organization: f64,
    pub naming_consistency: f64,
    pub depth: f64,
    pub temp_file_ratio: f64,
    pub bucket: HealthBucket,
    pub summary: String,
}

/// Ratios feeding the score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealthInputs {
    pub duplication: f64,
    pub organization: f64,
    pub naming: f64,
    pub depth: f64,
    pub temp: f64,
}

impl HealthInputs {
    /// Derive the ratios from a finished run.
    pub fn from_run(
        statistics: &ScanStatistics,
        duplicates: &DuplicateReport,
        recommendations: &[Recommendation],
    ) -> Self {
        let files_in = |pred: &dyn Fn(&Recommendation) -> bool| -> u64 {
            recommendations
                .iter()
                .filter(|r| pred(r))
                .map(|r| r.file_count)
                .sum()
        };
        let files = statistics.total_files;

        Self {
            duplication: ratio(duplicates.total_wasted_space, statistics.total_bytes),
            organization: ratio(
                files_in(&|r| {
                    r.kind == RecommendationKind::BuildArtifactCleanup || r.is_near_duplicate()
                }),
                files,
            ),
            naming: ratio(
                files_in(&|r| r.kind == RecommendationKind::VersioningSuggestion),
                files,
            ),
            depth: statistics.deep_file_ratio(),
            temp: ratio(
                files_in(&|r| r.kind == RecommendationKind::TempFileCleanup),
                files,
            ),
        }
    }
}

/// Pure scoring function over [`HealthInputs`].
#[derive(Debug, Default)]
pub struct HealthScorer;

impl HealthScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, inputs: &HealthInputs) -> HealthScore {
        let dimension = |ratio: f64, (scale, _): (f64, f64)| {
            100.0 * (1.0 - (ratio * scale).clamp(0.0, 1.0))
        };

        let duplication = dimension(inputs.duplication, DUPLICATION);
        let organization = dimension(inputs.organization, ORGANIZATION);
        let naming = dimension(inputs.naming, NAMING);
        let depth = dimension(inputs.depth, DEPTH);
        let temp = dimension(inputs.temp, TEMP);

        let weighted = duplication * DUPLICATION.1
            + organization * ORGANIZATION.1
            + naming * NAMING.1
            + depth * DEPTH.1
            + temp * TEMP.1;
        let overall = round1(weighted.clamp(0.0, 100.0));
        let bucket = HealthBucket::from_score(overall);

        HealthScore {
            overall,
            duplication: round1(duplication),
            organization: round1(organization),
            naming_consistency: round1(naming),
            depth: round1(depth),
            temp_file_ratio: round1(temp),
            bucket,
            summary: bucket.summary().to_string(),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
