//! AST-aware chunker: extracts one chunk per top-level definition (class,
//! function, method) plus aggregated chunks for everything else, falling
//! back to fixed line windows when a file's language has no grammar or
//! parsing doesn't yield anything usable.

use std::path::Path;

use anyhow::Result;

use crate::file::Language;

use super::extractor::{extract_dependencies, extract_exports, extract_imports, get_extractor};
use super::fallback::{chunk_by_lines, DEFAULT_WINDOW_LINES};
use super::grammar::GrammarManager;
use super::parser::{collect_definitions, RawDefinition};
use super::tree_sitter::TreeSitterParser;
use super::{dedup::dedup_exact, Chunk, ChunkKind, Chunker};

/// Default bound on lines per chunk before it is split.
pub const DEFAULT_MAX_LINES: usize = 200;
/// Default minimum lines a split piece should retain where possible.
pub const DEFAULT_MIN_LINES: usize = 5;

pub struct SemanticChunker {
    grammars: GrammarManager,
    min_lines: usize,
    max_lines: usize,
    context_lines: usize,
}

impl SemanticChunker {
    /// `min_lines`/`max_lines` bound how large a single emitted chunk may
    /// be (oversized definitions are split, undersized gaps between
    /// definitions are still emitted as-is). `context_lines` is how many
    /// lines of surrounding source are captured in `context_prev`/
    /// `context_next` for search-result display.
    pub fn new(min_lines: usize, max_lines: usize, context_lines: usize) -> Self {
        Self {
            grammars: GrammarManager::new(),
            min_lines: min_lines.max(1),
            max_lines: max_lines.max(1),
            context_lines,
        }
    }

    /// Chunk `source` from `path`, already knowing its language (avoids a
    /// second extension lookup when the caller already has a `FileInfo`).
    pub fn chunk_semantic(&self, language: Language, path: &Path, source: &str) -> Result<Vec<Chunk>> {
        let path_str = path.to_string_lossy().to_string();

        if !language.has_ast_support() {
            return Ok(dedup_exact(chunk_by_lines(
                &path_str,
                source,
                DEFAULT_WINDOW_LINES,
            )));
        }

        let parser = TreeSitterParser::new(&self.grammars);
        let tree = match parser.parse(language, source) {
            Ok(Some(tree)) => tree,
            Ok(None) | Err(_) => {
                return Ok(dedup_exact(chunk_by_lines(
                    &path_str,
                    source,
                    DEFAULT_WINDOW_LINES,
                )))
            }
        };

        let extractor = match get_extractor(language) {
            Some(e) => e,
            None => {
                return Ok(dedup_exact(chunk_by_lines(
                    &path_str,
                    source,
                    DEFAULT_WINDOW_LINES,
                )))
            }
        };

        let defs = collect_definitions(tree.root_node(), source.as_bytes(), extractor.as_ref());

        if defs.is_empty() && tree.root_node().has_error() {
            return Ok(dedup_exact(chunk_by_lines(
                &path_str,
                source,
                DEFAULT_WINDOW_LINES,
            )));
        }

        let lines: Vec<&str> = source.lines().collect();
        let mut chunks = self.chunks_from_definitions(&path_str, &lines, &defs);
        self.fill_gaps(&path_str, &lines, &mut chunks);
        self.attach_surrounding_context(&lines, &mut chunks);

        let imports = extract_imports(tree.root_node(), source.as_bytes(), extractor.as_ref());
        let exports = extract_exports(tree.root_node(), source.as_bytes(), extractor.as_ref());
        let dependencies = extract_dependencies(&imports);
        for chunk in &mut chunks {
            chunk.imports = imports.clone();
            chunk.exports = exports.clone();
            chunk.dependencies = dependencies.clone();
        }

        chunks.sort_by_key(|c| c.start_line);
        Ok(dedup_exact(chunks))
    }

    fn chunks_from_definitions(
        &self,
        path: &str,
        lines: &[&str],
        defs: &[RawDefinition<'_>],
    ) -> Vec<Chunk> {
        let mut out = Vec::with_capacity(defs.len());

        for def in defs {
            let start = def.node.start_position().row;
            let end = def.node.end_position().row;

            // Empty bodies (whitespace only) are still emitted if named —
            // skip only truly nameless, zero-width nodes.
            if def.name.is_none() && start == end && lines.get(start).map(|l| l.trim().is_empty()).unwrap_or(true) {
                continue;
            }

            let piece_count = (end - start + 1).div_ceil(self.max_lines).max(1);
            if piece_count == 1 {
                let content = slice_lines(lines, start, end);
                let mut chunk = Chunk::new(content, start, end, def.kind, path.to_string());
                chunk.signature = def.signature.clone();
                chunk.docstring = def.docstring.clone();
                chunk.context = def.context.clone();
                chunk.symbols = def.symbols.clone();
                out.push(chunk);
            } else {
                for i in 0..piece_count {
                    let piece_start = start + i * self.max_lines;
                    let piece_end = (piece_start + self.max_lines - 1).min(end);
                    // Merge a too-small trailing remainder into the previous piece.
                    if i == piece_count - 1 && piece_end - piece_start + 1 < self.min_lines && i > 0 {
                        if let Some(prev) = out.last_mut() {
                            prev.end_line = piece_end;
                            prev.content = slice_lines(lines, prev.start_line, piece_end);
                        }
                        break;
                    }
                    let content = slice_lines(lines, piece_start, piece_end);
                    let mut chunk = Chunk::new(content, piece_start, piece_end, def.kind, path.to_string());
                    chunk.signature = def.signature.clone();
                    chunk.docstring = if i == 0 { def.docstring.clone() } else { None };
                    chunk.context = def.context.clone();
                    chunk.symbols = if i == 0 { def.symbols.clone() } else { Vec::new() };
                    chunk.is_complete = false;
                    chunk.split_index = Some(i);
                    out.push(chunk);
                }
            }
        }

        out
    }

    /// Aggregate any source lines not covered by a definition chunk
    /// (imports, top-level statements, constants) into `Other`-kind
    /// chunks, themselves bounded by `max_lines`.
    fn fill_gaps(&self, path: &str, lines: &[&str], chunks: &mut Vec<Chunk>) {
        if lines.is_empty() {
            return;
        }

        let mut covered = vec![false; lines.len()];
        for chunk in chunks.iter() {
            for row in chunk.start_line..=chunk.end_line.min(lines.len().saturating_sub(1)) {
                covered[row] = true;
            }
        }

        let mut gap_start: Option<usize> = None;
        let mut gaps = Vec::new();
        for (row, is_covered) in covered.iter().enumerate() {
            if *is_covered {
                if let Some(s) = gap_start.take() {
                    gaps.push((s, row - 1));
                }
            } else if gap_start.is_none() {
                gap_start = Some(row);
            }
        }
        if let Some(s) = gap_start {
            gaps.push((s, lines.len() - 1));
        }

        for (start, end) in gaps {
            // Skip gaps that are entirely blank lines.
            if lines[start..=end].iter().all(|l| l.trim().is_empty()) {
                continue;
            }

            let piece_count = (end - start + 1).div_ceil(self.max_lines).max(1);
            for i in 0..piece_count {
                let piece_start = start + i * self.max_lines;
                let piece_end = (piece_start + self.max_lines - 1).min(end);
                let content = slice_lines(lines, piece_start, piece_end);
                let mut chunk = Chunk::new(content, piece_start, piece_end, ChunkKind::Other, path.to_string());
                chunk.is_complete = piece_count == 1;
                if piece_count > 1 {
                    chunk.split_index = Some(i);
                }
                chunks.push(chunk);
            }
        }
    }

    fn attach_surrounding_context(&self, lines: &[&str], chunks: &mut [Chunk]) {
        if self.context_lines == 0 {
            return;
        }
        for chunk in chunks.iter_mut() {
            if chunk.start_line > 0 {
                let from = chunk.start_line.saturating_sub(self.context_lines);
                chunk.context_prev = Some(slice_lines(lines, from, chunk.start_line - 1));
            }
            if chunk.end_line + 1 < lines.len() {
                let to = (chunk.end_line + self.context_lines).min(lines.len() - 1);
                chunk.context_next = Some(slice_lines(lines, chunk.end_line + 1, to));
            }
        }
    }
}

fn slice_lines(lines: &[&str], start: usize, end: usize) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let end = end.min(lines.len() - 1);
    if start > end {
        return String::new();
    }
    lines[start..=end].join("\n")
}

impl Chunker for SemanticChunker {
    fn chunk_file(&self, path: &Path, content: &str) -> Result<Vec<Chunk>> {
        let language = Language::from_path(path);
        self.chunk_semantic(language, path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn chunks_top_level_rust_function() {
        let chunker = SemanticChunker::new(5, 200, 2);
        let source = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        let chunks = chunker
            .chunk_semantic(Language::Rust, &PathBuf::from("a.rs"), source)
            .unwrap();

        assert!(chunks.iter().any(|c| c.kind == ChunkKind::Function));
        assert!(chunks.iter().all(|c| !c.id.is_empty()));
    }

    #[test]
    fn unsupported_language_falls_back_to_lines() {
        let chunker = SemanticChunker::new(5, 50, 2);
        let source = (0..120)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunker
            .chunk_semantic(Language::Markdown, &PathBuf::from("a.md"), &source)
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.kind == ChunkKind::Block));
    }

    #[test]
    fn oversized_definition_is_split() {
        let chunker = SemanticChunker::new(5, 10, 0);
        let body: String = (0..40).map(|i| format!("    let x{i} = {i};\n")).collect();
        let source = format!("fn big() {{\n{body}}}\n");
        let chunks = chunker
            .chunk_semantic(Language::Rust, &PathBuf::from("a.rs"), &source)
            .unwrap();

        let fn_chunks: Vec<_> = chunks.iter().filter(|c| c.kind == ChunkKind::Function).collect();
        assert!(fn_chunks.len() > 1);
        assert!(fn_chunks.iter().all(|c| !c.is_complete));
    }

    #[test]
    fn struct_chunk_collects_impl_method_symbols() {
        let chunker = SemanticChunker::new(5, 200, 2);
        let source = "struct Foo;\nimpl Foo {\n    fn bar(&self) {}\n    fn baz(&self) {}\n}\n";
        let chunks = chunker
            .chunk_semantic(Language::Rust, &PathBuf::from("a.rs"), source)
            .unwrap();

        let impl_chunk = chunks
            .iter()
            .find(|c| c.kind == ChunkKind::Impl)
            .expect("impl chunk should be present");
        assert!(impl_chunk.symbols.contains(&"bar".to_string()));
        assert!(impl_chunk.symbols.contains(&"baz".to_string()));
    }

    #[test]
    fn chunks_carry_file_level_imports_and_dependencies() {
        let chunker = SemanticChunker::new(5, 200, 2);
        let source = "use std::fmt;\n\nfn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        let chunks = chunker
            .chunk_semantic(Language::Rust, &PathBuf::from("a.rs"), source)
            .unwrap();

        let fn_chunk = chunks
            .iter()
            .find(|c| c.kind == ChunkKind::Function)
            .expect("function chunk should be present");
        assert!(fn_chunk.imports.iter().any(|i| i.contains("std::fmt")));
        assert!(fn_chunk.dependencies.contains(&"std".to_string()));
    }

    #[test]
    fn chunk_file_detects_language_from_extension() {
        let chunker = SemanticChunker::new(5, 200, 2);
        let chunks = chunker
            .chunk_file(&PathBuf::from("a.py"), "def f():\n    return 1\n")
            .unwrap();
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::Function));
    }
}
