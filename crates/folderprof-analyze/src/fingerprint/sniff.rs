//! Content-type sniffing from a file's leading bytes.

use std::io::Cursor;

use folderprof_core::{ContentKind, ContentType};
use image::ImageReader;

/// Classify a file from its first chunk. Extensions are never consulted.
pub fn sniff(head: &[u8]) -> ContentType {
    if head.is_empty() {
        return ContentType::empty();
    }
    let text = looks_like_text(head);
    if let Ok(format) = image::guess_format(head) {
        // Several signatures (`BM`, `P1`..`P7`, `#?RADIANCE`) are plain ASCII,
        // so a text-looking head only counts as an image if its header parses.
        if !text || header_decodes(head) {
            return ContentType::new(ContentKind::Image, format.to_mime_type());
        }
    }
    if text {
        return ContentType::text();
    }
    ContentType::binary()
}

fn header_decodes(head: &[u8]) -> bool {
    ImageReader::new(Cursor::new(head))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .is_some()
}

/// No NUL bytes and valid UTF-8, allowing a multi-byte sequence cut off by
/// the chunk boundary.
fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}
