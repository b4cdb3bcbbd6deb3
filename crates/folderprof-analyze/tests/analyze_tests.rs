use folderprof_analyze::{
    AnalysisConfig, AnalysisReport, AnalysisStatus, Analyzer, DuplicateReport, HealthBucket,
    MemoryCache, RecommendationKind, SignatureKind, SimilarityClusterer, SuggestedAction,
};
use folderprof_core::{
    ContentHash, ContentType, FileEntry, FileRecord, FileTree, Fingerprint, MinHashSignature,
    Signature,
};
use folderprof_scan::{JwalkScanner, ScanConfig};
use proptest::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn scan(root: &Path) -> FileTree {
    JwalkScanner::new().scan(&ScanConfig::new(root)).unwrap()
}

fn analyze(tree: &FileTree, config: AnalysisConfig) -> AnalysisReport {
    Analyzer::new(config)
        .unwrap()
        .analyze(tree, &CancellationToken::new())
        .unwrap()
}

/// Config whose clock sits a month ahead, so freshly written temp files
/// count as stale.
fn future_config() -> AnalysisConfig {
    AnalysisConfig::builder()
        .reference_time(SystemTime::now() + Duration::from_secs(30 * 24 * 60 * 60))
        .build()
        .unwrap()
}

fn words(range: std::ops::Range<usize>) -> String {
    range.map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
}

#[test]
fn test_identical_files_form_one_group() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "HELLO").unwrap();
    fs::write(temp.path().join("b.txt"), "HELLO").unwrap();

    let tree = scan(temp.path());
    let report = analyze(&tree, AnalysisConfig::default());

    assert_eq!(report.status, AnalysisStatus::Completed);
    assert_eq!(report.duplicates.group_count, 1);
    let group = &report.duplicates.groups[0];
    assert_eq!(group.count(), 2);
    assert_eq!(group.size, 5);
    assert_eq!(group.wasted_bytes, 5);
    assert_eq!(group.keeper(), tree.root_path.join("a.txt"));
    assert_eq!(report.duplicates.total_wasted_space, 5);

    assert!(report.clusters.is_empty());
    assert_eq!(report.recommendations.len(), 1);
    let rec = &report.recommendations[0];
    assert_eq!(rec.kind, RecommendationKind::DuplicateCleanup);
    assert_eq!(rec.action, SuggestedAction::Delete);
    assert_eq!(rec.paths, vec![tree.root_path.join("b.txt")]);
    assert_eq!(rec.estimated_savings, 5);

    // Half the bytes are wasted: duplication scores 0, everything else 100.
    assert_eq!(report.health.duplication, 0.0);
    assert_eq!(report.health.overall, 70.0);
    assert_eq!(report.health.bucket, HealthBucket::Fair);
}

#[test]
fn test_hand_made_signatures_cluster_by_threshold() {
    let a: Vec<u64> = (0..128).collect();
    // Agrees with `a` on 115 of 128 positions.
    let b: Vec<u64> = a
        .iter()
        .map(|&v| if v < 13 { v + 10_000 } else { v })
        .collect();
    // Agrees with both on 38 positions only.
    let c: Vec<u64> = a
        .iter()
        .map(|&v| if v < 90 { v + 20_000 } else { v })
        .collect();

    let record = |path: &str, byte: u8, values: Vec<u64>| {
        FileRecord::new(FileEntry::new(path, 64, SystemTime::UNIX_EPOCH), 1).with_fingerprint(
            Fingerprint {
                content_hash: ContentHash::new([byte; 32]),
                signature: Some(Signature::Text(MinHashSignature::new(values))),
                content_type: ContentType::text(),
            },
        )
    };
    let records = vec![
        record("/r/A.txt", 1, a),
        record("/r/B.txt", 2, b),
        record("/r/C.txt", 3, c),
    ];

    let clusters = SimilarityClusterer::new().cluster(&records, &DuplicateReport::default());

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].kind, SignatureKind::Text);
    assert_eq!(
        clusters[0].paths,
        vec![PathBuf::from("/r/A.txt"), PathBuf::from("/r/B.txt")]
    );
    assert!(clusters[0].average_similarity >= 0.85);
}

#[test]
fn test_deep_chain_yields_one_nesting_warning() {
    let temp = TempDir::new().unwrap();
    let mut dir = temp.path().to_path_buf();
    for level in 1..=12 {
        dir.push(format!("d{level}"));
    }
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("leaf.txt"), "deep inside").unwrap();

    let tree = scan(temp.path());
    let config = AnalysisConfig::builder().max_depth(10u32).build().unwrap();
    let report = analyze(&tree, config);

    let nesting: Vec<_> = report
        .recommendations
        .iter()
        .filter(|r| r.kind == RecommendationKind::DeepNestingWarning)
        .collect();
    assert_eq!(nesting.len(), 1);

    let expected: PathBuf = (1..=11).fold(tree.root_path.clone(), |p, level| {
        p.join(format!("d{level}"))
    });
    assert_eq!(nesting[0].paths, vec![expected]);
    assert_eq!(nesting[0].action, SuggestedAction::Restructure);
    assert_eq!(nesting[0].file_count, 1);
    assert_eq!(report.statistics.deep_files, 1);
    assert_eq!(report.statistics.max_depth, 13);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_reported_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let locked = temp.path().join("locked.txt");
    fs::write(&locked, "HELLO").unwrap();
    fs::write(temp.path().join("a.txt"), "HELLO").unwrap();
    fs::write(temp.path().join("b.txt"), "HELLO").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can still read it; nothing to check then.
    let readable = fs::File::open(&locked).is_ok();

    let tree = scan(temp.path());
    let report = analyze(&tree, AnalysisConfig::default());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    if readable {
        return;
    }
    let locked = tree.root_path.join("locked.txt");

    assert_eq!(report.status, AnalysisStatus::Completed);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, locked);
    assert_eq!(report.statistics.errored_files, 1);
    assert_eq!(report.statistics.total_files, 2);

    assert_eq!(report.duplicates.group_count, 1);
    assert!(!report.duplicates.groups[0].paths.contains(&locked));
    assert!(report
        .recommendations
        .iter()
        .all(|r| !r.paths.contains(&locked)));
}

#[test]
fn test_empty_tree_scores_perfect() {
    let temp = TempDir::new().unwrap();
    let report = analyze(&scan(temp.path()), AnalysisConfig::default());

    assert!(report.duplicates.groups.is_empty());
    assert!(report.clusters.is_empty());
    assert!(report.recommendations.is_empty());
    assert_eq!(report.health.overall, 100.0);
    assert_eq!(report.health.bucket, HealthBucket::Excellent);
}

#[test]
fn test_zero_byte_files_are_not_duplicates() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "").unwrap();
    fs::write(temp.path().join("b.txt"), "").unwrap();

    let report = analyze(&scan(temp.path()), AnalysisConfig::default());
    assert!(!report.duplicates.has_duplicates());
    assert_eq!(report.statistics.total_files, 2);
}

#[test]
fn test_edited_text_is_near_duplicate() {
    let temp = TempDir::new().unwrap();
    let original = words(0..300);
    let edited = format!("{} changed", words(0..299));
    fs::write(temp.path().join("draft.txt"), &original).unwrap();
    fs::write(temp.path().join("draft_edit.txt"), &edited).unwrap();
    fs::write(temp.path().join("other.txt"), words(1000..1300)).unwrap();

    let tree = scan(temp.path());
    let report = analyze(&tree, AnalysisConfig::default());

    assert!(report.duplicates.groups.is_empty());
    assert_eq!(report.clusters.len(), 1);
    assert_eq!(report.clusters[0].kind, SignatureKind::Text);
    assert_eq!(
        report.clusters[0].paths,
        vec![
            tree.root_path.join("draft.txt"),
            tree.root_path.join("draft_edit.txt")
        ]
    );

    let review: Vec<_> = report
        .recommendations
        .iter()
        .filter(|r| r.is_near_duplicate())
        .collect();
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].action, SuggestedAction::Review);
    assert_eq!(review[0].file_count, 2);
}

#[test]
fn test_exact_copies_stay_out_of_clusters() {
    let temp = TempDir::new().unwrap();
    let original = words(0..300);
    fs::write(temp.path().join("a.txt"), &original).unwrap();
    fs::write(temp.path().join("b.txt"), &original).unwrap();
    fs::write(temp.path().join("c.txt"), format!("{} changed", words(0..299))).unwrap();

    let tree = scan(temp.path());
    let root = tree.root_path.clone();
    let report = analyze(&tree, AnalysisConfig::default());

    assert_eq!(report.duplicates.group_count, 1);
    assert_eq!(report.duplicates.groups[0].keeper(), root.join("a.txt"));

    assert_eq!(report.clusters.len(), 1);
    assert_eq!(
        report.clusters[0].paths,
        vec![root.join("a.txt"), root.join("c.txt")]
    );
    assert!(report
        .clusters
        .iter()
        .all(|c| !c.paths.contains(&root.join("b.txt"))));
}

#[test]
fn test_text_with_image_like_prefix_is_compared_as_text() {
    let temp = TempDir::new().unwrap();
    let bmw = format!("BMW {}", words(0..300));
    let bmw_edit = format!("BMW {} changed", words(0..299));
    let pencils = format!("P2 {}", words(1000..1300));
    let pencils_edit = format!("P2 {} changed", words(1000..1299));
    fs::write(temp.path().join("bmw.txt"), &bmw).unwrap();
    fs::write(temp.path().join("bmw_edit.txt"), &bmw_edit).unwrap();
    fs::write(temp.path().join("pencils.txt"), &pencils).unwrap();
    fs::write(temp.path().join("pencils_edit.txt"), &pencils_edit).unwrap();

    let tree = scan(temp.path());
    let root = tree.root_path.clone();
    let report = analyze(&tree, AnalysisConfig::default());

    assert_eq!(report.clusters.len(), 2);
    assert!(report.clusters.iter().all(|c| c.kind == SignatureKind::Text));
    for pair in [["bmw.txt", "bmw_edit.txt"], ["pencils.txt", "pencils_edit.txt"]] {
        let expected: Vec<PathBuf> = pair.iter().map(|name| root.join(name)).collect();
        assert!(
            report.clusters.iter().any(|c| c.paths == expected),
            "{pair:?}"
        );
    }
}

#[test]
fn test_similar_images_cluster() {
    let temp = TempDir::new().unwrap();
    let gradient = image::RgbImage::from_fn(64, 64, |x, y| {
        image::Rgb([(x * 4) as u8, (y * 2) as u8, 90])
    });
    let mut touched = gradient.clone();
    touched.put_pixel(5, 5, image::Rgb([255, 0, 0]));
    let reversed = image::RgbImage::from_fn(64, 64, |x, y| {
        image::Rgb([255 - (x * 4) as u8, (y * 2) as u8, 90])
    });

    gradient.save(temp.path().join("photo.png")).unwrap();
    touched.save(temp.path().join("photo_touched.png")).unwrap();
    reversed.save(temp.path().join("mirror.png")).unwrap();

    let tree = scan(temp.path());
    let report = analyze(&tree, AnalysisConfig::default());

    assert_eq!(report.clusters.len(), 1);
    assert_eq!(report.clusters[0].kind, SignatureKind::Image);
    assert_eq!(
        report.clusters[0].paths,
        vec![
            tree.root_path.join("photo.png"),
            tree.root_path.join("photo_touched.png")
        ]
    );
}

#[test]
fn test_cleanup_rules() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("notes.tmp"), "scratch").unwrap();
    fs::write(root.join("~$letter.docx"), "lock").unwrap();
    fs::create_dir_all(root.join("target/debug/deps")).unwrap();
    fs::write(root.join("target/debug/app"), [0u8, 1, 2, 3, 4]).unwrap();
    fs::write(root.join("target/debug/deps/util.o"), [9u8, 8, 7]).unwrap();
    fs::write(root.join("module.pyc"), [5u8, 6]).unwrap();
    fs::write(root.join("report_v1.txt"), "one two three").unwrap();
    fs::write(root.join("report_v2.txt"), "four five six seven").unwrap();
    fs::write(root.join("report-final.txt"), "eight nine ten eleven twelve").unwrap();

    let tree = scan(root);
    let root = tree.root_path.clone();
    let report = analyze(&tree, future_config());

    let of_kind = |kind| {
        report
            .recommendations
            .iter()
            .filter(|r| r.kind == kind)
            .collect::<Vec<_>>()
    };

    let temps = of_kind(RecommendationKind::TempFileCleanup);
    assert_eq!(temps.len(), 1);
    assert_eq!(
        temps[0].paths,
        vec![root.join("notes.tmp"), root.join("~$letter.docx")]
    );
    assert_eq!(temps[0].estimated_savings, 11);

    let artifacts = of_kind(RecommendationKind::BuildArtifactCleanup);
    assert_eq!(artifacts.len(), 2);
    let target = artifacts
        .iter()
        .find(|r| r.paths == vec![root.join("target")])
        .unwrap();
    assert_eq!(target.file_count, 2);
    assert_eq!(target.estimated_savings, 8);
    let loose = artifacts
        .iter()
        .find(|r| r.paths == vec![root.join("module.pyc")])
        .unwrap();
    assert_eq!(loose.file_count, 1);

    let versions = of_kind(RecommendationKind::VersioningSuggestion);
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].file_count, 3);
    assert_eq!(versions[0].action, SuggestedAction::Review);

    assert!(report.health.temp_file_ratio < 100.0);
    assert!(report.health.organization < 100.0);
    assert!(report.health.naming_consistency < 100.0);

    // Recommendations come ordered by priority.
    assert!(report
        .recommendations
        .windows(2)
        .all(|w| w[0].priority <= w[1].priority));
}

#[test]
fn test_fresh_temp_files_are_kept() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("notes.tmp"), "scratch").unwrap();

    let report = analyze(&scan(temp.path()), AnalysisConfig::default());
    assert!(report
        .recommendations
        .iter()
        .all(|r| r.kind != RecommendationKind::TempFileCleanup));
}

#[test]
fn test_cancelled_run_is_partial() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "HELLO").unwrap();
    fs::write(temp.path().join("b.txt"), "HELLO").unwrap();

    let tree = scan(temp.path());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = Analyzer::new(AnalysisConfig::default())
        .unwrap()
        .analyze(&tree, &cancel)
        .unwrap();

    assert_eq!(
        report.status,
        AnalysisStatus::Cancelled {
            processed: 0,
            total: 2
        }
    );
    assert!(report.duplicates.groups.is_empty());
    assert!(report.errors.is_empty());
}

#[test]
fn test_pipeline_is_idempotent() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), words(0..50)).unwrap();
    fs::write(temp.path().join("b.txt"), words(0..50)).unwrap();
    fs::write(temp.path().join("c.txt"), format!("{} x", words(0..49))).unwrap();
    fs::write(temp.path().join("old.bak"), "backup").unwrap();

    let tree = scan(temp.path());
    let analyzer = Analyzer::new(future_config()).unwrap();
    let first = analyzer.analyze(&tree, &CancellationToken::new()).unwrap();
    let second = analyzer.analyze(&tree, &CancellationToken::new()).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_cache_serves_repeat_runs() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.txt"), "HELLO").unwrap();
    fs::write(temp.path().join("b.txt"), "HELLO").unwrap();

    let tree = scan(temp.path());
    let cache = Arc::new(MemoryCache::new());
    let analyzer = Analyzer::new(AnalysisConfig::default())
        .unwrap()
        .with_cache(cache.clone());

    let first = analyzer.analyze(&tree, &CancellationToken::new()).unwrap();
    assert_eq!(cache.len(), 2);

    // Served from the cache even after the files are gone.
    fs::remove_file(temp.path().join("a.txt")).unwrap();
    fs::remove_file(temp.path().join("b.txt")).unwrap();
    let second = analyzer.analyze(&tree, &CancellationToken::new()).unwrap();

    assert!(second.errors.is_empty());
    assert_eq!(first.duplicates, second.duplicates);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_clusters_refine_as_threshold_rises(
        differing in prop::collection::vec(0usize..128, 2..8),
        low in 0.5f64..0.95,
        step in 0.0f64..0.05,
    ) {
        let base: Vec<u64> = (0..128).collect();
        let records: Vec<FileRecord> = differing
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let values = base
                    .iter()
                    .map(|&v| if (v as usize) < n { v + 1000 * (i as u64 + 1) } else { v })
                    .collect();
                FileRecord::new(
                    FileEntry::new(format!("/r/{i}.txt"), 10, SystemTime::UNIX_EPOCH),
                    1,
                )
                .with_fingerprint(Fingerprint {
                    content_hash: ContentHash::new([i as u8; 32]),
                    signature: Some(Signature::Text(MinHashSignature::new(values))),
                    content_type: ContentType::text(),
                })
            })
            .collect();

        let clusterer = |threshold: f64| {
            let config = AnalysisConfig::builder()
                .similarity_threshold(threshold)
                .build()
                .unwrap();
            SimilarityClusterer::with_config(&config).cluster(&records, &DuplicateReport::default())
        };
        let loose = clusterer(low);
        let strict = clusterer(low + step);

        // Every strict cluster lies inside one loose cluster.
        for cluster in &strict {
            prop_assert!(loose
                .iter()
                .any(|outer| cluster.paths.iter().all(|p| outer.paths.contains(p))));
        }
    }

    #[test]
    fn prop_analysis_is_idempotent(contents in prop::collection::vec("[a-c ]{0,24}", 1..6)) {
        let temp = TempDir::new().unwrap();
        for (i, body) in contents.iter().enumerate() {
            fs::write(temp.path().join(format!("f{i}.txt")), body).unwrap();
        }
        let tree = scan(temp.path());
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();

        let first = analyzer.analyze(&tree, &CancellationToken::new()).unwrap();
        let second = analyzer.analyze(&tree, &CancellationToken::new()).unwrap();
        prop_assert_eq!(first, second);
    }
}
