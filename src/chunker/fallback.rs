//! Fixed-window line-based chunking, used when a file's language has no
//! tree-sitter grammar, or when parsing fails.

use super::{Chunk, ChunkKind};

/// Default window size, in lines, for fallback chunking.
pub const DEFAULT_WINDOW_LINES: usize = 50;

/// Split `content` into fixed-size, non-overlapping line windows.
///
/// The final window may be shorter than `window_lines` if the file doesn't
/// divide evenly. An empty file produces no chunks.
pub fn chunk_by_lines(path: &str, content: &str, window_lines: usize) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let window_lines = window_lines.max(1);
    let mut chunks = Vec::with_capacity(lines.len().div_ceil(window_lines));

    let mut start = 0;
    while start < lines.len() {
        let end = (start + window_lines).min(lines.len());
        let text = lines[start..end].join("\n");

        let mut chunk = Chunk::new(text, start, end.saturating_sub(1), ChunkKind::Block, path.to_string());
        chunk.is_complete = false;
        chunks.push(chunk);

        start = end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_fixed_windows() {
        let content = (0..120)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");

        let chunks = chunk_by_lines("f.txt", &content, 50);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_line, 0);
        assert_eq!(chunks[0].end_line, 49);
        assert_eq!(chunks[2].start_line, 100);
        assert_eq!(chunks[2].end_line, 119);
    }

    #[test]
    fn empty_file_produces_no_chunks() {
        assert!(chunk_by_lines("f.txt", "", 50).is_empty());
    }

    #[test]
    fn fallback_chunks_are_marked_incomplete() {
        let chunks = chunk_by_lines("f.txt", "a\nb\nc", 50);
        assert!(!chunks[0].is_complete);
        assert_eq!(chunks[0].kind, ChunkKind::Block);
    }
}
