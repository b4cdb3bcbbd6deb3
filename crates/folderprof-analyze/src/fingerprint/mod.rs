//! Per-file fingerprinting: exact content hash plus similarity signature.
//!
//! Each file is streamed once in fixed-size chunks. The first chunk decides
//! the content type; every chunk feeds the BLAKE3 hasher and, for text below
//! the size ceiling, the MinHash shingler. Images are decoded separately for
//! the perceptual hash.

mod cache;
mod minhash;
mod perceptual;
mod sniff;

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use folderprof_core::{
    AnalysisConfig, AnalysisError, CacheKey, ContentHash, FileEntry, FileError, FileRecord, FileTree,
    Fingerprint, Signature, path_depth,
};

pub use cache::{FingerprintCache, MemoryCache};
pub use minhash::{MinHasher, ShingleStream};
pub use perceptual::{hash_file as perceptual_hash_file, hash_image as perceptual_hash_image};
pub use sniff::sniff;

/// Files between two progress broadcasts.
const PROGRESS_INTERVAL: u64 = 64;

/// Progress information during fingerprinting.
#[derive(Debug, Clone)]
pub struct FingerprintProgress {
    /// Files processed so far.
    pub files_processed: u64,
    /// Total files to process.
    pub total_files: u64,
    /// Bytes hashed so far.
    pub bytes_hashed: u64,
    /// Most recently finished file.
    pub current_file: Option<PathBuf>,
}

/// Everything the fingerprinting stage produced.
#[derive(Debug, Clone, Default)]
pub struct FingerprintRun {
    /// Successfully fingerprinted records, in tree order.
    pub records: Vec<FileRecord>,
    /// Files that could not be read.
    pub errors: Vec<FileError>,
    /// Files attempted before cancellation (all files when not cancelled).
    pub processed: usize,
    /// Files in the tree.
    pub total: usize,
}

impl FingerprintRun {
    /// Whether cancellation skipped any file.
    pub fn was_cancelled(&self) -> bool {
        self.processed < self.total
    }
}

enum Outcome {
    Done(FileRecord),
    Failed(FileError),
    Skipped,
}

/// Streaming fingerprinter running on a bounded rayon pool.
pub struct Fingerprinter {
    config: AnalysisConfig,
    minhasher: MinHasher,
    cache: Option<Arc<dyn FingerprintCache>>,
    progress_tx: broadcast::Sender<FingerprintProgress>,
}

impl Fingerprinter {
    /// Create a fingerprinter for an already validated configuration.
    pub fn new(config: AnalysisConfig) -> Self {
        let minhasher = MinHasher::new(config.signature_length, config.shingle_size);
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            config,
            minhasher,
            cache: None,
            progress_tx,
        }
    }

    /// Consult `cache` before computing and store fresh fingerprints in it.
    pub fn with_cache(mut self, cache: Arc<dyn FingerprintCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Subscribe to fingerprinting progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<FingerprintProgress> {
        self.progress_tx.subscribe()
    }

    /// Fingerprint every entry of `tree`.
    ///
    /// The token is checked before each file; once it fires the remaining
    /// files are skipped and the run holds what was finished.
    pub fn fingerprint_tree(
        &self,
        tree: &FileTree,
        cancel: &CancellationToken,
    ) -> Result<FingerprintRun, AnalysisError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|i| format!("folderprof-fp-{i}"))
            .build()
            .map_err(|e| AnalysisError::WorkerPool {
                message: e.to_string(),
            })?;

        let total = tree.entries.len();
        let processed = AtomicU64::new(0);
        let bytes_hashed = AtomicU64::new(0);

        let outcomes: Vec<Outcome> = pool.install(|| {
            tree.entries
                .par_iter()
                .map(|entry| {
                    if cancel.is_cancelled() {
                        return Outcome::Skipped;
                    }
                    let outcome = self.process_entry(&tree.root_path, entry);

                    let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    let bytes = bytes_hashed.fetch_add(entry.size, Ordering::Relaxed) + entry.size;
                    if done % PROGRESS_INTERVAL == 0 || done == total as u64 {
                        let _ = self.progress_tx.send(FingerprintProgress {
                            files_processed: done,
                            total_files: total as u64,
                            bytes_hashed: bytes,
                            current_file: Some(entry.path.clone()),
                        });
                    }
                    outcome
                })
                .collect()
        });

        let mut run = FingerprintRun {
            total,
            ..FingerprintRun::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Done(record) => {
                    run.processed += 1;
                    run.records.push(record);
                }
                Outcome::Failed(error) => {
                    run.processed += 1;
                    run.errors.push(error);
                }
                Outcome::Skipped => {}
            }
        }

        tracing::debug!(
            processed = run.processed,
            total,
            errors = run.errors.len(),
            "fingerprinting finished"
        );
        Ok(run)
    }

    fn process_entry(&self, root: &Path, entry: &FileEntry) -> Outcome {
        let key = CacheKey::from(entry);
        let record = FileRecord::new(entry.clone(), path_depth(root, &entry.path));

        if let Some(fingerprint) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            return Outcome::Done(record.with_fingerprint(fingerprint));
        }

        match self.fingerprint_file(&entry.path, entry.size) {
            Ok(fingerprint) => {
                if let Some(cache) = &self.cache {
                    cache.put(key, fingerprint.clone());
                }
                Outcome::Done(record.with_fingerprint(fingerprint))
            }
            Err(err) => {
                tracing::warn!(path = %entry.path.display(), "cannot fingerprint: {err}");
                Outcome::Failed(FileError::from_io(&entry.path, &err))
            }
        }
    }

    /// Hash, sniff and sign a single file.
    pub fn fingerprint_file(&self, path: &Path, size: u64) -> io::Result<Fingerprint> {
        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; self.config.chunk_size];
        let mut hasher = blake3::Hasher::new();
        let eligible = size <= self.config.max_signature_size;

        let read = read_full(&mut file, &mut buffer)?;
        let head = &buffer[..read];
        let content_type = sniff(head);
        hasher.update(head);

        let mut shingles = (eligible && content_type.is_text()).then(|| self.minhasher.stream());
        if let Some(stream) = shingles.as_mut() {
            stream.update(head);
        }

        loop {
            let read = read_full(&mut file, &mut buffer)?;
            if read == 0 {
                break;
            }
            let chunk = &buffer[..read];
            hasher.update(chunk);
            if let Some(stream) = shingles.as_mut() {
                stream.update(chunk);
            }
        }

        let signature = if let Some(stream) = shingles {
            stream.finish().map(Signature::Text)
        } else if eligible && content_type.is_image() {
            perceptual::hash_file(path).map(Signature::Image)
        } else {
            None
        };

        Ok(Fingerprint {
            content_hash: ContentHash::new(*hasher.finalize().as_bytes()),
            signature,
            content_type,
        })
    }
}

/// Fill `buffer` unless the file ends first; returns the bytes read.
fn read_full(file: &mut File, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match file.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folderprof_core::{ContentKind, FileTree};
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn fingerprinter() -> Fingerprinter {
        Fingerprinter::new(AnalysisConfig::default())
    }

    #[test]
    fn test_identical_bytes_hash_equal() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "HELLO").unwrap();
        fs::write(temp.path().join("b.txt"), "HELLO").unwrap();
        fs::write(temp.path().join("c.txt"), "HELLO!").unwrap();

        let fp = fingerprinter();
        let a = fp.fingerprint_file(&temp.path().join("a.txt"), 5).unwrap();
        let b = fp.fingerprint_file(&temp.path().join("b.txt"), 5).unwrap();
        let c = fp.fingerprint_file(&temp.path().join("c.txt"), 6).unwrap();

        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.content_hash, c.content_hash);
        assert_eq!(a.content_hash.0, *blake3::hash(b"HELLO").as_bytes());
        assert!(a.signature.as_ref().is_some_and(Signature::is_text));
    }

    #[test]
    fn test_chunking_matches_whole_file_hash() {
        let temp = TempDir::new().unwrap();
        let body: String = (0..5000).map(|i| format!("token{i} ")).collect();
        let path = temp.path().join("big.txt");
        fs::write(&path, &body).unwrap();

        let mut config = AnalysisConfig::default();
        config.chunk_size = 100;
        let small_chunks = Fingerprinter::new(config)
            .fingerprint_file(&path, body.len() as u64)
            .unwrap();
        let default_chunks = fingerprinter()
            .fingerprint_file(&path, body.len() as u64)
            .unwrap();

        assert_eq!(small_chunks, default_chunks);
    }

    #[test]
    fn test_size_ceiling_drops_signature() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "some words in a file").unwrap();

        let mut config = AnalysisConfig::default();
        config.max_signature_size = 4;
        let fingerprint = Fingerprinter::new(config).fingerprint_file(&path, 20).unwrap();

        assert!(fingerprint.signature.is_none());
        assert!(fingerprint.content_type.is_text());
    }

    #[test]
    fn test_empty_and_binary_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("empty"), "").unwrap();
        fs::write(temp.path().join("blob"), [0u8, 1, 2, 3, 0]).unwrap();

        let fp = fingerprinter();
        let empty = fp.fingerprint_file(&temp.path().join("empty"), 0).unwrap();
        let blob = fp.fingerprint_file(&temp.path().join("blob"), 5).unwrap();

        assert_eq!(empty.content_type.kind, ContentKind::Empty);
        assert!(empty.signature.is_none());
        assert_eq!(blob.content_type.kind, ContentKind::Binary);
        assert!(blob.signature.is_none());
    }

    #[test]
    fn test_missing_file_becomes_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("here.txt"), "present").unwrap();
        let now = SystemTime::now();
        let tree = FileTree::from_entries(
            temp.path(),
            vec![
                FileEntry::new(temp.path().join("gone.txt"), 3, now),
                FileEntry::new(temp.path().join("here.txt"), 7, now),
            ],
        );

        let run = fingerprinter()
            .fingerprint_tree(&tree, &CancellationToken::new())
            .unwrap();

        assert_eq!(run.records.len(), 1);
        assert_eq!(run.errors.len(), 1);
        assert_eq!(run.errors[0].kind, folderprof_core::FileErrorKind::NotFound);
        assert!(!run.was_cancelled());
    }

    #[test]
    fn test_cancelled_before_start() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        let tree = FileTree::from_entries(
            temp.path(),
            vec![FileEntry::new(temp.path().join("a.txt"), 1, SystemTime::now())],
        );

        let token = CancellationToken::new();
        token.cancel();
        let run = fingerprinter().fingerprint_tree(&tree, &token).unwrap();

        assert_eq!(run.processed, 0);
        assert_eq!(run.total, 1);
        assert!(run.was_cancelled());
    }

    #[test]
    fn test_cache_is_consulted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "cached words here").unwrap();
        let entry = FileEntry::new(&path, 17, SystemTime::now());
        let tree = FileTree::from_entries(temp.path(), vec![entry.clone()]);

        let cache = Arc::new(MemoryCache::new());
        let fp = fingerprinter().with_cache(cache.clone());
        let first = fp.fingerprint_tree(&tree, &CancellationToken::new()).unwrap();
        assert_eq!(cache.len(), 1);

        // Served from the cache even though the file is gone.
        fs::remove_file(&path).unwrap();
        let second = fp.fingerprint_tree(&tree, &CancellationToken::new()).unwrap();
        assert!(second.errors.is_empty());
        assert_eq!(first.records, second.records);
    }
}
