//! Text preparation for field extraction.

mod normalize;

pub use normalize::normalize;

/// Zero-based line index of a byte offset in `text`.
pub fn line_index(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count()
}
