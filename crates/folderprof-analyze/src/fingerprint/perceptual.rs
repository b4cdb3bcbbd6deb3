//! Gradient perceptual hashing for images.

use std::path::Path;

use image::{DynamicImage, ImageReader, Limits};
use image_hasher::{HashAlg, HasherConfig};

use folderprof_core::PerceptualHash;

/// Largest width or height decoded for hashing.
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

/// Upper bound on decoder allocations per image.
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// Decode `path` and compute its 64-bit dHash.
///
/// `None` when the file cannot be decoded or exceeds the decode limits;
/// that is not an error.
pub fn hash_file(path: &Path) -> Option<PerceptualHash> {
    let mut reader = ImageReader::open(path).ok()?.with_guessed_format().ok()?;
    reader.limits(decode_limits());
    let img = reader.decode();
    match img {
        Ok(img) => hash_image(&img),
        Err(err) => {
            tracing::debug!(path = %path.display(), "image decode failed: {err}");
            None
        }
    }
}

/// dHash over an 8x8 gradient grid.
pub fn hash_image(img: &DynamicImage) -> Option<PerceptualHash> {
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Gradient)
        .hash_size(8, 8)
        .to_hasher();
    let hash = hasher.hash_image(img);
    let bytes: [u8; 8] = hash.as_bytes().try_into().ok()?;
    Some(PerceptualHash::new(u64::from_be_bytes(bytes)))
}
