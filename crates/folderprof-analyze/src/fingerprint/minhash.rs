//! Streaming MinHash over word shingles.

use std::collections::VecDeque;
use std::hash::Hasher as _;

use twox_hash::XxHash64;

use folderprof_core::MinHashSignature;

/// Modulus of the universal hash family (2^61 - 1, a Mersenne prime).
const MERSENNE_61: u64 = (1 << 61) - 1;

/// Seed for the permutation coefficients. Changing it invalidates every
/// cached signature.
const COEFFICIENT_SEED: u64 = 0x243F_6A88_85A3_08D3;

/// Longest token kept; extra bytes of a longer run are dropped.
const MAX_TOKEN_LEN: usize = 256;

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// The `k` permutations `(a·x + b) mod p` shared by every signature of a run.
#[derive(Debug, Clone)]
pub struct MinHasher {
    coefficients: Vec<(u64, u64)>,
    shingle_size: usize,
}

impl MinHasher {
    /// Derive `signature_length` permutations from the fixed seed.
    pub fn new(signature_length: usize, shingle_size: usize) -> Self {
        let mut state = COEFFICIENT_SEED;
        let coefficients = (0..signature_length)
            .map(|_| {
                let a = splitmix64(&mut state) % (MERSENNE_61 - 1) + 1;
                let b = splitmix64(&mut state) % MERSENNE_61;
                (a, b)
            })
            .collect();
        Self {
            coefficients,
            shingle_size: shingle_size.max(1),
        }
    }

    pub fn signature_length(&self) -> usize {
        self.coefficients.len()
    }

    /// Start a new document.
    pub fn stream(&self) -> ShingleStream<'_> {
        ShingleStream {
            hasher: self,
            window: VecDeque::with_capacity(self.shingle_size),
            token: Vec::with_capacity(32),
            tokens_seen: 0,
            minimums: vec![u64::MAX; self.coefficients.len()],
        }
    }

    /// Signature of an in-memory document.
    pub fn signature_of(&self, bytes: &[u8]) -> Option<MinHashSignature> {
        let mut stream = self.stream();
        stream.update(bytes);
        stream.finish()
    }

    fn permute(a: u64, b: u64, x: u64) -> u64 {
        let value = (u128::from(a) * u128::from(x % MERSENNE_61) + u128::from(b))
            % u128::from(MERSENNE_61);
        value as u64
    }
}

/// Incremental tokeniser and MinHash accumulator for one document.
///
/// Only the last `shingle_size` tokens are held; chunk boundaries may fall
/// anywhere, including inside a token.
#[derive(Debug)]
pub struct ShingleStream<'a> {
    hasher: &'a MinHasher,
    window: VecDeque<Vec<u8>>,
    token: Vec<u8>,
    tokens_seen: usize,
    minimums: Vec<u64>,
}

impl ShingleStream<'_> {
    /// Feed the next chunk of the document.
    pub fn update(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            if byte.is_ascii_alphanumeric() || !byte.is_ascii() {
                if self.token.len() < MAX_TOKEN_LEN {
                    self.token.push(byte.to_ascii_lowercase());
                }
            } else if !self.token.is_empty() {
                self.end_token();
            }
        }
    }

    /// Close the document. `None` when it held no tokens at all.
    pub fn finish(mut self) -> Option<MinHashSignature> {
        if !self.token.is_empty() {
            self.end_token();
        }
        match self.tokens_seen {
            0 => None,
            n if n < self.hasher.shingle_size => {
                // Short document: one shingle of everything it has.
                self.absorb_window();
                Some(MinHashSignature::new(self.minimums))
            }
            _ => Some(MinHashSignature::new(self.minimums)),
        }
    }

    fn end_token(&mut self) {
        let token = std::mem::take(&mut self.token);
        if self.window.len() == self.hasher.shingle_size {
            self.window.pop_front();
        }
        self.window.push_back(token);
        self.tokens_seen += 1;

        if self.window.len() == self.hasher.shingle_size {
            self.absorb_window();
        }
    }

    fn absorb_window(&mut self) {
        let mut digest = XxHash64::with_seed(0);
        for (i, token) in self.window.iter().enumerate() {
            if i > 0 {
                digest.write_u8(b' ');
            }
            digest.write(token);
        }
        let shingle = digest.finish();

        for (min, &(a, b)) in self.minimums.iter_mut().zip(&self.hasher.coefficients) {
            let value = MinHasher::permute(a, b, shingle);
            if value < *min {
                *min = value;
            }
        }
    }
}
