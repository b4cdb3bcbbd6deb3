//! File records and content fingerprints.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// BLAKE3 content hash used as the identity for exact-duplicate grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Coarse classification derived from a file's leading bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ContentKind {
    /// Zero-length file.
    Empty,
    /// UTF-8 text without NUL bytes.
    Text,
    /// A raster format the image decoder recognises.
    Image,
    /// Anything else.
    Binary,
}

/// Content-type guess produced by sniffing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentType {
    /// Coarse kind.
    pub kind: ContentKind,
    /// MIME string.
    pub mime: String,
}

impl ContentType {
    /// Create a content type.
    pub fn new(kind: ContentKind, mime: impl Into<String>) -> Self {
        Self {
            kind,
            mime: mime.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(ContentKind::Empty, "application/x-empty")
    }

    pub fn text() -> Self {
        Self::new(ContentKind::Text, "text/plain; charset=utf-8")
    }

    pub fn binary() -> Self {
        Self::new(ContentKind::Binary, "application/octet-stream")
    }

    /// Check if the content is text-like.
    pub fn is_text(&self) -> bool {
        self.kind == ContentKind::Text
    }

    /// Check if the content is image-like.
    pub fn is_image(&self) -> bool {
        self.kind == ContentKind::Image
    }
}

/// Fixed-length MinHash sketch of a shingle set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MinHashSignature(pub Vec<u64>);

impl MinHashSignature {
    pub fn new(values: Vec<u64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    /// Estimated Jaccard similarity: the fraction of positions that agree.
    ///
    /// Signatures of different lengths are incomparable and estimate to 0.
    pub fn estimate_similarity(&self, other: &Self) -> f64 {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return 0.0;
        }
        let agreeing = self.0.iter().zip(&other.0).filter(|(a, b)| a == b).count();
        agreeing as f64 / self.0.len() as f64
    }
}

/// 64-bit perceptual image hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerceptualHash(pub u64);

impl PerceptualHash {
    /// Number of bits in the hash.
    pub const BITS: u32 = 64;

    pub fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// Hamming distance between two hashes.
    pub fn distance(&self, other: &Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Similarity in [0, 1]: one minus the normalised Hamming distance.
    pub fn similarity(&self, other: &Self) -> f64 {
        1.0 - f64::from(self.distance(other)) / f64::from(Self::BITS)
    }
}

/// Approximate similarity signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signature {
    /// MinHash over text shingles.
    Text(MinHashSignature),
    /// Perceptual hash over a downsampled luminance grid.
    Image(PerceptualHash),
}

impl Signature {
    /// Similarity between two signatures of the same kind.
    ///
    /// Returns `None` when the kinds differ; text and images are never compared.
    pub fn similarity(&self, other: &Self) -> Option<f64> {
        match (self, other) {
            (Signature::Text(a), Signature::Text(b)) => Some(a.estimate_similarity(b)),
            (Signature::Image(a), Signature::Image(b)) => Some(a.similarity(b)),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Signature::Text(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Signature::Image(_))
    }
}

/// Everything derived from a file's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Digest over the full byte stream.
    pub content_hash: ContentHash,
    /// Similarity signature, if the file was eligible.
    pub signature: Option<Signature>,
    /// Sniffed content type.
    pub content_type: ContentType,
}

/// Identity tuple for one regular file, as handed over by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl FileEntry {
    /// Create a new file entry.
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
        }
    }
}

/// Key under which fingerprints are cached between runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

impl From<&FileEntry> for CacheKey {
    fn from(entry: &FileEntry) -> Self {
        Self {
            path: entry.path.clone(),
            size: entry.size,
            modified: entry.modified,
        }
    }
}

/// A scanned regular file together with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Number of path components below the scan root (a file at the root is 1).
    pub depth: u32,
    /// Content hash (None until fingerprinted).
    pub content_hash: Option<ContentHash>,
    /// Similarity signature (None when ineligible).
    pub signature: Option<Signature>,
    /// Content-type guess (None until fingerprinted).
    pub content_type: Option<ContentType>,
}

impl FileRecord {
    /// Create an unfingerprinted record from a scanner entry.
    pub fn new(entry: FileEntry, depth: u32) -> Self {
        Self {
            path: entry.path,
            size: entry.size,
            modified: entry.modified,
            depth,
            content_hash: None,
            signature: None,
            content_type: None,
        }
    }

    /// Attach a fingerprint, consuming the record.
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.content_hash = Some(fingerprint.content_hash);
        self.signature = fingerprint.signature;
        self.content_type = Some(fingerprint.content_type);
        self
    }

    /// File name as a lossy string.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Depth of the directory holding this file.
    pub fn parent_depth(&self) -> u32 {
        self.depth.saturating_sub(1)
    }

    /// Keeper order: shallowest depth first, then lexicographically smallest path.
    pub fn keeper_order(&self, other: &Self) -> Ordering {
        self.depth
            .cmp(&other.depth)
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// Number of components of `path` below `root`.
///
/// Paths outside `root` count all of their components.
pub fn path_depth(root: &Path, path: &Path) -> u32 {
    let count = match path.strip_prefix(root) {
        Ok(rel) => rel.components().count(),
        Err(_) => path.components().count(),
    };
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(hash.to_hex().len(), 64);
        assert!(hash.to_hex().starts_with("abab"));
    }

    #[test]
    fn test_minhash_estimate() {
        let a = MinHashSignature::new(vec![1, 2, 3, 4]);
        let b = MinHashSignature::new(vec![1, 2, 9, 9]);
        assert!((a.estimate_similarity(&b) - 0.5).abs() < f64::EPSILON);
        assert_eq!(a.estimate_similarity(&MinHashSignature::new(vec![1])), 0.0);
    }

    #[test]
    fn test_perceptual_distance() {
        let a = PerceptualHash::new(0b1011);
        let b = PerceptualHash::new(0b0001);
        assert_eq!(a.distance(&b), 2);
        assert!((a.similarity(&a) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_signature_kinds_never_compare() {
        let text = Signature::Text(MinHashSignature::new(vec![0; 4]));
        let image = Signature::Image(PerceptualHash::new(0));
        assert_eq!(text.similarity(&image), None);
    }

    #[test]
    fn test_path_depth() {
        let root = Path::new("/scan");
        assert_eq!(path_depth(root, Path::new("/scan/a.txt")), 1);
        assert_eq!(path_depth(root, Path::new("/scan/x/y/b.txt")), 3);
        assert_eq!(path_depth(root, Path::new("/scan")), 0);
    }

    #[test]
    fn test_keeper_order() {
        let now = SystemTime::now();
        let shallow = FileRecord::new(FileEntry::new("/r/z.txt", 1, now), 1);
        let deep = FileRecord::new(FileEntry::new("/r/a/a.txt", 1, now), 2);
        assert_eq!(shallow.keeper_order(&deep), Ordering::Less);

        let sibling = FileRecord::new(FileEntry::new("/r/b.txt", 1, now), 1);
        assert_eq!(sibling.keeper_order(&shallow), Ordering::Less);
    }
}
