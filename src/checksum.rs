//! Content fingerprinting: file checksums and deterministic chunk ids.
//!
//! Every identity-bearing value in the index is derived here so that the
//! same input always produces the same id, regardless of which process or
//! machine computed it. This is what lets the incremental orchestrator
//! compare a freshly-read file against what was indexed last time without
//! keeping the file's old bytes around.

use sha2::{Digest, Sha256};

/// SHA-256 checksum of a file's raw bytes, as lowercase hex.
///
/// Used by the incremental orchestrator to confirm a file's content is
/// unchanged even when its mtime moved (touch, checkout, clock skew).
pub fn file_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Deterministic id for a chunk, derived from the file path it came from,
/// its line span, and its content.
///
/// Two chunks with identical spans and content in the same file always get
/// the same id, so re-indexing an unchanged file reproduces the same chunk
/// ids rather than minting new ones. Changing a single character inside the
/// span, or shifting the span by one line, changes the id.
pub fn chunk_id(file_path: &str, start_line: usize, end_line: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update(b"\0");
    hasher.update((start_line as u64).to_le_bytes());
    hasher.update(b"\0");
    hasher.update((end_line as u64).to_le_bytes());
    hasher.update(b"\0");
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_checksum_is_deterministic() {
        let a = file_checksum(b"hello world");
        let b = file_checksum(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn file_checksum_changes_with_content() {
        let a = file_checksum(b"hello world");
        let b = file_checksum(b"hello world!");
        assert_ne!(a, b);
    }

    #[test]
    fn chunk_id_is_deterministic_and_stable() {
        let a = chunk_id("src/lib.rs", 10, 20, "fn foo() {}");
        let b = chunk_id("src/lib.rs", 10, 20, "fn foo() {}");
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_id_changes_with_any_component() {
        let base = chunk_id("src/lib.rs", 10, 20, "fn foo() {}");
        assert_ne!(base, chunk_id("src/other.rs", 10, 20, "fn foo() {}"));
        assert_ne!(base, chunk_id("src/lib.rs", 11, 20, "fn foo() {}"));
        assert_ne!(base, chunk_id("src/lib.rs", 10, 21, "fn foo() {}"));
        assert_ne!(base, chunk_id("src/lib.rs", 10, 20, "fn bar() {}"));
    }
}
