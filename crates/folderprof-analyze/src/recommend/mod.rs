//! Prioritized cleanup recommendations.
//!
//! Evaluators run in the declaration order of [`RecommendationKind`]; each
//! is a pure function of the [`RuleContext`]. The engine concatenates their
//! output and stable-sorts it by priority, then by estimated savings.

mod rules;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

use folderprof_core::{AnalysisConfig, FileRecord};

use crate::duplicates::DuplicateReport;
use crate::patterns::PatternSet;
use crate::similarity::SimilarityCluster;
use crate::statistics::ScanStatistics;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// The closed set of recommendation kinds, in evaluation order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RecommendationKind {
    DuplicateCleanup,
    TempFileCleanup,
    BuildArtifactCleanup,
    DeepNestingWarning,
    VersioningSuggestion,
}

/// Urgency of a recommendation. Orders highest first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Priority {
    /// Band on an absolute byte count.
    pub fn from_bytes(bytes: u64) -> Self {
        match bytes {
            b if b >= GIB => Priority::Critical,
            b if b >= 100 * MIB => Priority::High,
            b if b >= 10 * MIB => Priority::Medium,
            b if b >= MIB => Priority::Low,
            _ => Priority::Info,
        }
    }

    /// Band on a share of the whole tree.
    pub fn from_fraction(fraction: f64) -> Self {
        match fraction {
            f if f >= 0.10 => Priority::Critical,
            f if f >= 0.05 => Priority::High,
            f if f >= 0.01 => Priority::Medium,
            f if f >= 0.001 => Priority::Low,
            _ => Priority::Info,
        }
    }

    /// The more urgent of the two.
    pub fn raised_to(self, other: Self) -> Self {
        self.min(other)
    }

    /// Never more urgent than `ceiling`.
    pub fn capped_at(self, ceiling: Self) -> Self {
        self.max(ceiling)
    }

    /// One level less urgent; `Info` stays `Info`.
    pub fn lowered(self) -> Self {
        match self {
            Priority::Critical => Priority::High,
            Priority::High => Priority::Medium,
            Priority::Medium => Priority::Low,
            Priority::Low | Priority::Info => Priority::Info,
        }
    }
}

/// What acting on a recommendation means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SuggestedAction {
    /// The listed paths can be deleted.
    Delete,
    /// The listed paths should be inspected by a person.
    Review,
    /// The listed directories should be flattened or moved.
    Restructure,
}

/// A single, immutable cleanup suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub action: SuggestedAction,
    /// Short headline.
    pub title: String,
    /// Human-readable explanation.
    pub rationale: String,
    /// Paths the action applies to.
    pub paths: Vec<PathBuf>,
    /// Files affected, counting every file below a listed directory.
    pub file_count: u64,
    /// Bytes reclaimed by acting on it.
    pub estimated_savings: u64,
}

impl Recommendation {
    /// Whether this is a review of near-duplicate content.
    pub fn is_near_duplicate(&self) -> bool {
        self.kind == RecommendationKind::DuplicateCleanup && self.action == SuggestedAction::Review
    }
}

/// Everything an evaluator may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub root: &'a Path,
    pub records: &'a [FileRecord],
    pub directories: &'a BTreeSet<PathBuf>,
    pub statistics: &'a ScanStatistics,
    pub duplicates: &'a DuplicateReport,
    pub clusters: &'a [SimilarityCluster],
    pub patterns: &'a PatternSet,
    pub config: &'a AnalysisConfig,
}

/// Runs every evaluator and orders the result.
#[derive(Debug, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every kind in order.
    pub fn recommend(&self, ctx: &RuleContext<'_>) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = RecommendationKind::iter()
            .flat_map(|kind| {
                let produced = rules::evaluate(kind, ctx);
                tracing::debug!(%kind, count = produced.len(), "rule evaluated");
                produced
            })
            .collect();

        recommendations.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.estimated_savings.cmp(&a.estimated_savings))
        });
        recommendations
    }
}
