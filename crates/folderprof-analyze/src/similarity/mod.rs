//! Near-duplicate clustering.
//!
//! Text signatures are bucketed with MinHash LSH banding and image hashes
//! are searched through a BK-tree. Confirmed pairs are merged with
//! union-find; every component of two or more files becomes a cluster.

mod bktree;
mod union_find;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use folderprof_core::{AnalysisConfig, FileRecord, PerceptualHash, Signature};

use crate::duplicates::DuplicateReport;

pub use bktree::BkTree;
pub use union_find::UnionFind;

/// Which kind of signature a cluster was built from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SignatureKind {
    Text,
    Image,
}

/// Files whose confirmed pairwise similarity reaches the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityCluster {
    /// Signature kind shared by every member.
    pub kind: SignatureKind,
    /// Members sorted by (depth, path); the first is the representative.
    pub paths: Vec<PathBuf>,
    /// Size of each member, parallel to `paths`.
    pub sizes: Vec<u64>,
    /// Mean similarity over the confirmed edges inside the cluster.
    pub average_similarity: f64,
}

impl SimilarityCluster {
    pub fn representative(&self) -> &Path {
        &self.paths[0]
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.sizes.iter().sum()
    }

    /// Bytes held by members other than the representative.
    pub fn potential_savings(&self) -> u64 {
        self.total_size().saturating_sub(self.sizes[0])
    }
}

/// A confirmed pair of participants.
#[derive(Debug, Clone, Copy)]
struct Edge {
    a: usize,
    b: usize,
    similarity: f64,
}

/// Groups near-duplicate files into clusters.
#[derive(Debug, Clone)]
pub struct SimilarityClusterer {
    threshold: f64,
    bands: usize,
    signature_length: usize,
    max_hamming: u32,
}

impl SimilarityClusterer {
    /// Create a clusterer with default config.
    pub fn new() -> Self {
        Self::with_config(&AnalysisConfig::default())
    }

    /// Create a clusterer with custom config.
    pub fn with_config(config: &AnalysisConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
            bands: config.lsh_bands.max(1),
            signature_length: config.signature_length,
            max_hamming: config.max_hamming_distance(),
        }
    }

    /// Cluster the signed records of a run.
    ///
    /// Only the keeper of each exact-duplicate group participates, so no
    /// cluster can hold two copies of the same content.
    pub fn cluster(
        &self,
        records: &[FileRecord],
        duplicates: &DuplicateReport,
    ) -> Vec<SimilarityCluster> {
        let redundant: HashSet<&Path> = duplicates
            .groups
            .iter()
            .flat_map(|g| g.redundant().iter().map(PathBuf::as_path))
            .collect();

        let mut participants: Vec<&FileRecord> = records
            .iter()
            .filter(|r| r.signature.is_some() && !redundant.contains(r.path.as_path()))
            .collect();
        participants.sort_by(|a, b| a.path.cmp(&b.path));

        if participants.len() < 2 {
            return Vec::new();
        }

        let mut edges = self.text_edges(&participants);
        edges.extend(self.image_edges(&participants));

        let mut forest = UnionFind::new(participants.len());
        for edge in &edges {
            forest.union(edge.a, edge.b);
        }

        let mut edge_totals: HashMap<usize, (f64, usize)> = HashMap::new();
        for edge in &edges {
            let root = forest.find(edge.a);
            let total = edge_totals.entry(root).or_insert((0.0, 0));
            total.0 += edge.similarity;
            total.1 += 1;
        }

        let mut clusters: Vec<SimilarityCluster> = forest
            .components()
            .into_iter()
            .filter(|members| members.len() >= 2)
            .filter_map(|members| {
                let root = forest.find(members[0]);
                let (sum, count) = edge_totals.get(&root).copied().unwrap_or((0.0, 0));

                let mut records: Vec<&FileRecord> =
                    members.iter().map(|&i| participants[i]).collect();
                records.sort_by(|a, b| a.keeper_order(b));

                let kind = match records[0].signature.as_ref()? {
                    Signature::Text(_) => SignatureKind::Text,
                    Signature::Image(_) => SignatureKind::Image,
                };
                Some(SimilarityCluster {
                    kind,
                    paths: records.iter().map(|r| r.path.clone()).collect(),
                    sizes: records.iter().map(|r| r.size).collect(),
                    average_similarity: if count > 0 { sum / count as f64 } else { 0.0 },
                })
            })
            .collect();

        clusters.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then_with(|| a.representative().cmp(b.representative()))
        });

        tracing::debug!(
            participants = participants.len(),
            edges = edges.len(),
            clusters = clusters.len(),
            "similarity clustering done"
        );
        clusters
    }

    /// LSH banding over MinHash signatures, then exact confirmation.
    fn text_edges(&self, participants: &[&FileRecord]) -> Vec<Edge> {
        let rows = self.signature_length / self.bands;
        let mut buckets: HashMap<(usize, &[u64]), Vec<usize>> = HashMap::new();

        for (index, record) in participants.iter().enumerate() {
            let Some(Signature::Text(signature)) = &record.signature else {
                continue;
            };
            if signature.len() != self.signature_length {
                continue;
            }
            for (band, values) in signature.as_slice().chunks_exact(rows).enumerate() {
                buckets.entry((band, values)).or_default().push(index);
            }
        }

        let mut candidates: BTreeSet<(usize, usize)> = BTreeSet::new();
        for members in buckets.values().filter(|m| m.len() >= 2) {
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    candidates.insert((a.min(b), a.max(b)));
                }
            }
        }

        candidates
            .into_iter()
            .filter_map(|(a, b)| {
                let similarity = participants[a]
                    .signature
                    .as_ref()?
                    .similarity(participants[b].signature.as_ref()?)?;
                (similarity >= self.threshold).then_some(Edge { a, b, similarity })
            })
            .collect()
    }

    /// BK-tree range search over perceptual hashes.
    fn image_edges(&self, participants: &[&FileRecord]) -> Vec<Edge> {
        let mut tree = BkTree::new();
        let mut edges = Vec::new();

        for (index, record) in participants.iter().enumerate() {
            let Some(Signature::Image(PerceptualHash(hash))) = &record.signature else {
                continue;
            };
            let hash = *hash;
            for (other, distance) in tree.find_within(hash, self.max_hamming) {
                edges.push(Edge {
                    a: other,
                    b: index,
                    similarity: 1.0 - f64::from(distance) / f64::from(PerceptualHash::BITS),
                });
            }
            tree.insert(hash, index);
        }
        edges
    }
}

impl Default for SimilarityClusterer {
    fn default() -> Self {
        Self::new()
    }
}
