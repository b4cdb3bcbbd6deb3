//! End-to-end pipeline: fingerprint, group, cluster, recommend, score.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use folderprof_core::{AnalysisConfig, AnalysisError, FileError, FileTree};

use crate::duplicates::{DuplicateGrouper, DuplicateReport};
use crate::fingerprint::{FingerprintCache, FingerprintProgress, Fingerprinter};
use crate::health::{HealthInputs, HealthScore, HealthScorer};
use crate::patterns::PatternSet;
use crate::recommend::{Recommendation, RecommendationEngine, RuleContext};
use crate::similarity::{SimilarityCluster, SimilarityClusterer};
use crate::statistics::{ScanStatistics, directory_set};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AnalysisStatus {
    Completed,
    /// Cancelled after `processed` of `total` files; later stages saw only
    /// those files.
    Cancelled { processed: usize, total: usize },
}

impl AnalysisStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, AnalysisStatus::Completed)
    }
}

/// Complete result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub root: PathBuf,
    pub status: AnalysisStatus,
    pub statistics: ScanStatistics,
    pub duplicates: DuplicateReport,
    pub clusters: Vec<SimilarityCluster>,
    pub recommendations: Vec<Recommendation>,
    pub health: HealthScore,
    /// Files that could not be read.
    pub errors: Vec<FileError>,
}

/// Runs the analysis stages over a scanned tree.
pub struct Analyzer {
    config: AnalysisConfig,
    patterns: PatternSet,
    fingerprinter: Fingerprinter,
}

impl Analyzer {
    /// Validate `config` and prepare the pipeline. Performs no I/O.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let patterns = PatternSet::from_config(&config)?;
        let fingerprinter = Fingerprinter::new(config.clone());
        Ok(Self {
            config,
            patterns,
            fingerprinter,
        })
    }

    /// Reuse fingerprints across runs.
    pub fn with_cache(mut self, cache: Arc<dyn FingerprintCache>) -> Self {
        self.fingerprinter = self.fingerprinter.with_cache(cache);
        self
    }

    /// Subscribe to fingerprinting progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<FingerprintProgress> {
        self.fingerprinter.subscribe()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze `tree`. Cancellation yields a partial report, not an error.
    pub fn analyze(
        &self,
        tree: &FileTree,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport, AnalysisError> {
        let root = tree.root_path.as_path();
        tracing::info!(root = %root.display(), files = tree.entries.len(), "analysis started");
        let started = Instant::now();

        let run = self.fingerprinter.fingerprint_tree(tree, cancel)?;
        tracing::debug!(elapsed = ?started.elapsed(), "fingerprint stage done");

        let status = if run.was_cancelled() {
            tracing::info!(processed = run.processed, total = run.total, "analysis cancelled");
            AnalysisStatus::Cancelled {
                processed: run.processed,
                total: run.total,
            }
        } else {
            AnalysisStatus::Completed
        };

        let directories = directory_set(root, &tree.directories, &run.records);
        let statistics = ScanStatistics::compute(
            root,
            &run.records,
            &directories,
            self.config.max_depth,
            run.errors.len() as u64,
        );

        let stage = Instant::now();
        let duplicates = DuplicateGrouper::new().group(&run.records);
        tracing::debug!(groups = duplicates.group_count, elapsed = ?stage.elapsed(), "grouping done");

        let stage = Instant::now();
        let clusters = SimilarityClusterer::with_config(&self.config).cluster(&run.records, &duplicates);
        tracing::debug!(clusters = clusters.len(), elapsed = ?stage.elapsed(), "clustering done");

        let recommendations = RecommendationEngine::new().recommend(&RuleContext {
            root,
            records: &run.records,
            directories: &directories,
            statistics: &statistics,
            duplicates: &duplicates,
            clusters: &clusters,
            patterns: &self.patterns,
            config: &self.config,
        });

        let health = HealthScorer::new().score(&HealthInputs::from_run(
            &statistics,
            &duplicates,
            &recommendations,
        ));

        tracing::info!(
            files = statistics.total_files,
            errors = run.errors.len(),
            duplicate_groups = duplicates.group_count,
            clusters = clusters.len(),
            recommendations = recommendations.len(),
            health = health.overall,
            elapsed = ?started.elapsed(),
            "analysis finished"
        );

        Ok(AnalysisReport {
            root: root.to_path_buf(),
            status,
            statistics,
            duplicates,
            clusters,
            recommendations,
            health,
            errors: run.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalysisConfig::default();
        config.similarity_threshold = 1.5;
        assert!(matches!(
            Analyzer::new(config),
            Err(AnalysisError::InvalidConfig { .. })
        ));

        let mut config = AnalysisConfig::default();
        config.temp_patterns = vec!["a{".to_string()];
        assert!(Analyzer::new(config).is_err());
    }

    #[test]
    fn test_empty_tree() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let tree = FileTree::from_entries("/nowhere", Vec::new());
        let report = analyzer.analyze(&tree, &CancellationToken::new()).unwrap();

        assert_eq!(report.status, AnalysisStatus::Completed);
        assert!(report.duplicates.groups.is_empty());
        assert!(report.clusters.is_empty());
        assert!(report.recommendations.is_empty());
        assert_eq!(report.health.overall, 100.0);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&AnalysisStatus::Cancelled {
            processed: 1,
            total: 3,
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"cancelled","processed":1,"total":3}"#);
    }
}
