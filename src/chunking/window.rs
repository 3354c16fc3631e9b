//! Sliding word-window splitter.
//!
//! Texts that fit in one window come back untouched (original whitespace
//! included). Longer texts are split on whitespace and each window is
//! re-joined with single spaces.

/// Split `text` into windows of `chunk_size` words advancing by `step` words.
///
/// Callers guarantee `step >= 1` and `step <= chunk_size`; see
/// [`super::ChunkConfig::validate`].
pub fn chunk_words(text: &str, chunk_size: usize, step: usize) -> Vec<String> {
    debug_assert!(step >= 1 && step <= chunk_size);

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::with_capacity(words.len() / step + 1);
    let mut start = 0usize;
    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_exact_size_is_single_chunk() {
        let text = numbered_words(10);
        let chunks = chunk_words(&text, 10, 8);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_empty_text_is_single_empty_chunk() {
        assert_eq!(chunk_words("", 10, 8), vec![String::new()]);
    }

    #[test]
    fn test_consecutive_chunks_overlap_by_exactly_overlap_words() {
        let text = numbered_words(25);
        let chunks = chunk_words(&text, 10, 7); // overlap = 3
        let first: Vec<&str> = chunks[0].split(' ').collect();
        let second: Vec<&str> = chunks[1].split(' ').collect();
        assert_eq!(first.len(), 10);
        assert_eq!(&first[7..], &second[..3]);
        assert_eq!(second[0], "w7");
    }

    #[test]
    fn test_windows_continue_until_start_passes_end() {
        // Starts at 0, 7, 14, 21 for 25 words.
        let text = numbered_words(25);
        let chunks = chunk_words(&text, 10, 7);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3], "w21 w22 w23 w24");
    }

    #[test]
    fn test_trailing_window_may_be_fully_overlapped() {
        // 12 words, size 10, step 8: starts at 0 and 8; second window is words 8..12.
        let text = numbered_words(12);
        let chunks = chunk_words(&text, 10, 8);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "w8 w9 w10 w11");
    }

    #[test]
    fn test_long_text_normalizes_whitespace() {
        let text = "a  b\n\nc\td e f";
        let chunks = chunk_words(text, 4, 2);
        assert_eq!(chunks[0], "a b c d");
        assert_eq!(chunks[1], "c d e f");
    }

    #[test]
    fn test_deterministic() {
        let text = numbered_words(3000);
        assert_eq!(chunk_words(&text, 1000, 800), chunk_words(&text, 1000, 800));
    }
}
