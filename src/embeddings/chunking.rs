//! Text shaping for embeddings.
//!
//! Providers cap their input size, so oversized file contents are either
//! truncated to the model limit or split into overlapping chunks whose
//! vectors are mean-pooled into one.
//!
//! Limits are in characters. Chunks break on whitespace where possible,
//! overlap their neighbours, and every cut lands on a char boundary.

/// Configuration for text chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum bytes per chunk.
    pub max_chars: usize,

    /// Number of bytes to overlap between chunks.
    pub overlap: usize,

    /// Minimum chunk size (avoids tiny trailing chunks).
    pub min_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 2000,
            overlap: 200,
            min_chunk_size: 100,
        }
    }
}

impl ChunkConfig {
    /// Chunking sized to a model's input limit: 10% overlap, 5% minimum.
    #[must_use]
    pub fn for_max_chars(max_chars: usize) -> Self {
        let max_chars = max_chars.max(1);
        Self {
            max_chars,
            overlap: max_chars / 10,
            min_chunk_size: (max_chars / 20).max(1),
        }
    }
}

/// A text chunk with its index.
#[derive(Debug, Clone)]
pub struct TextChunk {
    /// The chunk text.
    pub text: String,
    /// Zero-based index of this chunk.
    pub index: usize,
    /// Byte offset in the original (trimmed) text.
    pub start_offset: usize,
    /// Byte offset where this chunk ends.
    pub end_offset: usize,
}

/// Truncate `text` to at most `max_chars` characters.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Largest char boundary at or below `idx`.
fn floor_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Split text into overlapping chunks.
///
/// Uses word boundaries to avoid splitting mid-word.
///
/// # Examples
///
/// ```rust
/// use craft::embeddings::chunking::{chunk_text, ChunkConfig};
///
/// let config = ChunkConfig::default();
/// let chunks = chunk_text("This is a test.", &config);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].text, "This is a test.");
/// ```
#[must_use]
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    let text = text.trim();

    if text.is_empty() {
        return vec![];
    }

    if text.len() <= config.max_chars {
        return vec![TextChunk {
            text: text.to_string(),
            index: 0,
            start_offset: 0,
            end_offset: text.len(),
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut index = 0;

    while start < text.len() {
        let mut end = floor_boundary(text, start + config.max_chars);

        if end < text.len() {
            end = find_word_boundary(text, end, start + config.min_chunk_size);
        }
        // A single char wider than max_chars: take it whole to make progress.
        if end <= start {
            end = text[start..]
                .char_indices()
                .nth(1)
                .map_or(text.len(), |(i, _)| start + i);
        }

        let piece = &text[start..end];

        if piece.len() >= config.min_chunk_size || end >= text.len() {
            chunks.push(TextChunk {
                text: piece.to_string(),
                index,
                start_offset: start,
                end_offset: end,
            });
            index += 1;
        }

        if end >= text.len() {
            break;
        }

        let next_start = floor_boundary(text, end.saturating_sub(config.overlap));
        start = if next_start <= start { end } else { next_start };
    }

    chunks
}

/// Find a word boundary near the target position.
///
/// Searches backward from `target` to find a space or punctuation boundary.
/// Won't go further back than `min_pos`.
fn find_word_boundary(text: &str, target: usize, min_pos: usize) -> usize {
    let bytes = text.as_bytes();

    for i in (min_pos..=target).rev() {
        if i >= bytes.len() {
            continue;
        }

        let c = bytes[i];
        if c.is_ascii_whitespace() || matches!(c, b'.' | b'!' | b'?' | b';' | b',') {
            return (i + 1).min(text.len());
        }
    }

    target
}

/// Average equally sized vectors component-wise.
///
/// Returns `None` for an empty input or mismatched lengths.
#[must_use]
pub fn mean_pool(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dims = first.len();
    if dims == 0 || vectors.iter().any(|v| v.len() != dims) {
        return None;
    }

    let mut sum = vec![0.0f32; dims];
    for vector in vectors {
        for (acc, value) in sum.iter_mut().zip(vector) {
            *acc += value;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let count = vectors.len() as f32;
    Some(sum.into_iter().map(|v| v / count).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk() {
        let chunks = chunk_text("Hello world", &ChunkConfig::default());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello world");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_whitespace_only() {
        assert!(chunk_text("   \n\t  ", &ChunkConfig::default()).is_empty());
    }

    #[test]
    fn test_multiple_chunks() {
        let config = ChunkConfig {
            max_chars: 50,
            overlap: 10,
            min_chunk_size: 10,
        };

        let text = "The quick brown fox jumps over the lazy dog. This is a test sentence that should be split into multiple chunks.";
        let chunks = chunk_text(text, &config);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.text.len() <= config.max_chars);
            assert_eq!(chunk.index, i);
        }
        assert!(chunks[0].end_offset > chunks[1].start_offset);
    }

    #[test]
    fn test_multibyte_text_never_splits_a_char() {
        let config = ChunkConfig {
            max_chars: 7,
            overlap: 3,
            min_chunk_size: 1,
        };
        let text = "héllo wörld ünïcödé ßtring";
        let chunks = chunk_text(text, &config);

        assert!(!chunks.is_empty());
        assert!(chunks.last().unwrap().end_offset == text.len());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }

    #[test]
    fn test_for_max_chars() {
        let config = ChunkConfig::for_max_chars(1000);
        assert_eq!(config.overlap, 100);
        assert_eq!(config.min_chunk_size, 50);
    }

    #[test]
    fn test_mean_pool() {
        let pooled = mean_pool(&[vec![1.0, 3.0], vec![3.0, 5.0]]).unwrap();
        assert_eq!(pooled, vec![2.0, 4.0]);
        assert!(mean_pool(&[]).is_none());
        assert!(mean_pool(&[vec![1.0], vec![1.0, 2.0]]).is_none());
    }
}
