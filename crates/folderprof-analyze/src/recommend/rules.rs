//! The five evaluators.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use humansize::{BINARY, format_size};
use itertools::Itertools;

use folderprof_core::{FileRecord, path_depth};

use super::{Priority, Recommendation, RecommendationKind, RuleContext, SuggestedAction};
use crate::duplicates::DuplicateGroup;
use crate::patterns::split_version;
use crate::statistics::ratio;

/// Dispatch one kind to its evaluator.
pub(super) fn evaluate(kind: RecommendationKind, ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    match kind {
        RecommendationKind::DuplicateCleanup => duplicate_cleanup(ctx),
        RecommendationKind::TempFileCleanup => temp_file_cleanup(ctx),
        RecommendationKind::BuildArtifactCleanup => build_artifact_cleanup(ctx),
        RecommendationKind::DeepNestingWarning => deep_nesting(ctx),
        RecommendationKind::VersioningSuggestion => versioning(ctx),
    }
}

fn display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn savings_priority(bytes: u64, ctx: &RuleContext<'_>) -> Priority {
    let fraction = ratio(bytes, ctx.statistics.total_bytes);
    Priority::from_bytes(bytes).raised_to(Priority::from_fraction(fraction))
}

fn duplicate_cleanup(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let limit = ctx.config.max_duplicate_recommendations;
    let groups = &ctx.duplicates.groups;
    let (listed, overflow) = groups.split_at(groups.len().min(limit));

    let mut out: Vec<Recommendation> = listed
        .iter()
        .map(|group| exact_group(group, ctx))
        .collect();

    if !overflow.is_empty() {
        let wasted: u64 = overflow.iter().map(|g| g.wasted_bytes).sum();
        let paths: Vec<PathBuf> = overflow
            .iter()
            .flat_map(|g| g.redundant().iter().cloned())
            .collect();
        out.push(Recommendation {
            kind: RecommendationKind::DuplicateCleanup,
            priority: savings_priority(wasted, ctx),
            action: SuggestedAction::Delete,
            title: format!("Remove duplicates in {} more groups", overflow.len()),
            rationale: format!(
                "{} further duplicate groups hold {} redundant copies wasting {}.",
                overflow.len(),
                paths.len(),
                format_size(wasted, BINARY)
            ),
            file_count: paths.len() as u64,
            paths,
            estimated_savings: wasted,
        });
    }

    for cluster in ctx.clusters {
        let savings = cluster.potential_savings();
        out.push(Recommendation {
            kind: RecommendationKind::DuplicateCleanup,
            priority: savings_priority(savings, ctx).lowered(),
            action: SuggestedAction::Review,
            title: format!(
                "Review {} near-duplicate {} files",
                cluster.len(),
                cluster.kind
            ),
            rationale: format!(
                "These files are about {:.0}% similar to {}; keeping only one would free {}.",
                cluster.average_similarity * 100.0,
                display(cluster.representative(), ctx.root),
                format_size(savings, BINARY)
            ),
            paths: cluster.paths.clone(),
            file_count: cluster.len() as u64,
            estimated_savings: savings,
        });
    }

    out
}

fn exact_group(group: &DuplicateGroup, ctx: &RuleContext<'_>) -> Recommendation {
    let copies = group.deletable_count();
    Recommendation {
        kind: RecommendationKind::DuplicateCleanup,
        priority: savings_priority(group.wasted_bytes, ctx),
        action: SuggestedAction::Delete,
        title: format!(
            "Remove {copies} duplicate {} of {}",
            if copies == 1 { "copy" } else { "copies" },
            display(group.keeper(), ctx.root)
        ),
        rationale: format!(
            "{} files share identical content ({} each); keeping {} frees {}.",
            group.count(),
            format_size(group.size, BINARY),
            display(group.keeper(), ctx.root),
            format_size(group.wasted_bytes, BINARY)
        ),
        paths: group.redundant().to_vec(),
        file_count: copies as u64,
        estimated_savings: group.wasted_bytes,
    }
}

fn temp_file_cleanup(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let reference = ctx.config.reference_time;
    let temps: Vec<&FileRecord> = ctx
        .records
        .iter()
        .filter(|r| ctx.patterns.is_temp(&r.name()))
        .filter(|r| {
            let age = reference.duration_since(r.modified).unwrap_or_default();
            age >= ctx.config.temp_file_age
        })
        .sorted_by(|a, b| a.path.cmp(&b.path))
        .collect();

    if temps.is_empty() {
        return Vec::new();
    }

    let count = temps.len();
    let bytes: u64 = temps.iter().map(|r| r.size).sum();
    let by_count = match count {
        c if c > 100 => Priority::High,
        c if c > 10 => Priority::Medium,
        _ => Priority::Low,
    };
    let age_days = ctx.config.temp_file_age.as_secs() / 86_400;

    vec![Recommendation {
        kind: RecommendationKind::TempFileCleanup,
        priority: by_count.raised_to(Priority::from_bytes(bytes)),
        action: SuggestedAction::Delete,
        title: format!("Delete {count} temporary files"),
        rationale: format!(
            "{count} files look like temporary or backup leftovers untouched for at least {age_days} days, using {}.",
            format_size(bytes, BINARY)
        ),
        paths: temps.iter().map(|r| r.path.clone()).collect(),
        file_count: count as u64,
        estimated_savings: bytes,
    }]
}

fn build_artifact_cleanup(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let is_artifact_dir = |dir: &Path| {
        dir.file_name()
            .is_some_and(|n| ctx.patterns.is_artifact_dir(&n.to_string_lossy()))
    };

    // Outermost only: no ancestor below the root is itself an artifact dir.
    let roots: Vec<&PathBuf> = ctx
        .directories
        .iter()
        .filter(|dir| is_artifact_dir(dir.as_path()))
        .filter(|dir| {
            !dir.ancestors()
                .skip(1)
                .take_while(|a| *a != ctx.root && a.starts_with(ctx.root))
                .any(|a| is_artifact_dir(a))
        })
        .collect();

    let root_set: HashSet<&Path> = roots.iter().map(|dir| dir.as_path()).collect();
    let mut below_root: BTreeMap<&Path, (u64, u64)> = BTreeMap::new();
    let mut loose: Vec<&FileRecord> = Vec::new();
    for record in ctx.records {
        let owner = record
            .path
            .ancestors()
            .skip(1)
            .take_while(|a| *a != ctx.root && a.starts_with(ctx.root))
            .find(|a| root_set.contains(a));
        match owner {
            Some(dir) => {
                let totals = below_root.entry(dir).or_default();
                totals.0 += 1;
                totals.1 += record.size;
            }
            None if ctx.patterns.is_artifact_file(&record.name()) => loose.push(record),
            None => {}
        }
    }

    let mut out: Vec<Recommendation> = below_root
        .into_iter()
        .map(|(dir, (files, bytes))| Recommendation {
            kind: RecommendationKind::BuildArtifactCleanup,
            priority: Priority::from_bytes(bytes).capped_at(Priority::High),
            action: SuggestedAction::Delete,
            title: format!("Remove build output {}", display(dir, ctx.root)),
            rationale: format!(
                "{} holds {files} generated files ({}) that can be rebuilt.",
                display(dir, ctx.root),
                format_size(bytes, BINARY)
            ),
            paths: vec![dir.to_path_buf()],
            file_count: files,
            estimated_savings: bytes,
        })
        .collect();

    if !loose.is_empty() {
        let bytes: u64 = loose.iter().map(|r| r.size).sum();
        out.push(Recommendation {
            kind: RecommendationKind::BuildArtifactCleanup,
            priority: Priority::from_bytes(bytes).capped_at(Priority::High),
            action: SuggestedAction::Delete,
            title: format!("Remove {} compiled files", loose.len()),
            rationale: format!(
                "{} compiled files ({}) sit outside any build directory and can be regenerated.",
                loose.len(),
                format_size(bytes, BINARY)
            ),
            paths: loose.iter().map(|r| r.path.clone()).collect(),
            file_count: loose.len() as u64,
            estimated_savings: bytes,
        });
    }

    out
}

fn deep_nesting(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let max_depth = ctx.config.max_depth;
    let target = max_depth.saturating_add(1);

    // Files below each directory at the target depth, in one pass.
    let mut files_below: HashMap<&Path, u64> = HashMap::new();
    for record in ctx.records.iter().filter(|r| r.depth > target) {
        if let Some(dir) = record.path.ancestors().nth((record.depth - target) as usize) {
            *files_below.entry(dir).or_default() += 1;
        }
    }

    ctx.directories
        .iter()
        .filter(|dir| path_depth(ctx.root, dir) == target)
        .map(|dir| {
            let files = files_below.get(dir.as_path()).copied().unwrap_or(0);
            let priority = match files {
                f if f > 100 => Priority::Medium,
                f if f > 10 => Priority::Low,
                _ => Priority::Info,
            };
            Recommendation {
                kind: RecommendationKind::DeepNestingWarning,
                priority,
                action: SuggestedAction::Restructure,
                title: format!("Flatten deeply nested {}", display(dir, ctx.root)),
                rationale: format!(
                    "This directory sits {target} levels below the root, deeper than the limit of {max_depth}, and holds {files} files."
                ),
                paths: vec![dir.clone()],
                file_count: files,
                estimated_savings: 0,
            }
        })
        .collect()
}

fn versioning(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let mut families: BTreeMap<(PathBuf, String, String), Vec<(&FileRecord, bool)>> =
        BTreeMap::new();

    for record in ctx.records {
        let (Some(parent), Some(stem)) = (record.path.parent(), record.path.file_stem()) else {
            continue;
        };
        let versioned = split_version(&stem.to_string_lossy());
        families
            .entry((
                parent.to_path_buf(),
                versioned.base,
                record.extension().unwrap_or_default(),
            ))
            .or_default()
            .push((record, versioned.has_token));
    }

    families
        .into_iter()
        .filter(|(_, members)| members.len() >= 2 && members.iter().any(|(_, token)| *token))
        .map(|((dir, base, _), members)| {
            let newest = members
                .iter()
                .map(|(r, _)| *r)
                .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| b.path.cmp(&a.path)));
            let newest_size = newest.map_or(0, |r| r.size);
            let total: u64 = members.iter().map(|(r, _)| r.size).sum();
            let savings = total - newest_size;

            let count = members.len();
            let priority = match count {
                c if c >= 10 => Priority::Medium,
                c if c >= 5 => Priority::Low,
                _ => Priority::Info,
            };

            let mut paths: Vec<PathBuf> = members.iter().map(|(r, _)| r.path.clone()).collect();
            paths.sort();

            Recommendation {
                kind: RecommendationKind::VersioningSuggestion,
                priority,
                action: SuggestedAction::Review,
                title: format!("Consolidate {count} versions of \"{base}\""),
                rationale: format!(
                    "{count} manually versioned copies in {} could be replaced by the newest one{}, freeing {}.",
                    display(&dir, ctx.root),
                    newest
                        .map(|r| format!(" ({})", r.name()))
                        .unwrap_or_default(),
                    format_size(savings, BINARY)
                ),
                paths,
                file_count: count as u64,
                estimated_savings: savings,
            }
        })
        .collect()
}
