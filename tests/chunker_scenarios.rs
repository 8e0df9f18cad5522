use prism::chunker::SemanticChunker;
use prism::file::Language;
use std::path::Path;

#[test]
fn auth_file_yields_distinct_non_overlapping_declarations() {
    let chunker = SemanticChunker::new(1, 200, 3);
    let source = std::fs::read_to_string("tests/fixtures/auth.ts").unwrap();
    let chunks = chunker
        .chunk_semantic(Language::TypeScript, Path::new("auth.ts"), &source)
        .unwrap();

    assert!(!chunks.is_empty());

    let names = ["authenticateUser", "registerUser", "createResetToken", "AuthenticationError"];
    for name in names {
        assert!(
            chunks.iter().any(|c| c.content.contains(name)),
            "expected a chunk covering {name}"
        );
    }

    // Declarations that carry a doc comment should have it folded into the
    // chunk's range, not left dangling in a preceding gap chunk.
    let auth_fn = chunks
        .iter()
        .find(|c| c.content.contains("fn authenticateUser") || c.content.contains("authenticateUser"))
        .unwrap();
    assert!(auth_fn.docstring.is_some() || auth_fn.content.contains("Authenticates a user"));

    // No two chunks of the same file should overlap.
    let mut ranges: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start_line, c.end_line)).collect();
    ranges.sort();
    for pair in ranges.windows(2) {
        assert!(pair[0].1 < pair[1].0, "chunks {:?} and {:?} overlap", pair[0], pair[1]);
    }
}

#[test]
fn empty_file_yields_zero_chunks_no_error() {
    let chunker = SemanticChunker::new(1, 200, 3);
    let chunks = chunker
        .chunk_semantic(Language::Rust, Path::new("empty.rs"), "")
        .unwrap();
    assert!(chunks.is_empty());
}
