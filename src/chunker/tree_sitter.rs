//! Thin tree-sitter parsing wrapper used by the semantic chunker.

use crate::file::Language;
use anyhow::{anyhow, Result};
use tree_sitter::{Parser, Tree};

use super::grammar::GrammarManager;

/// Parses source text into a tree-sitter [`Tree`] for a given language,
/// reusing cached grammars from a shared [`GrammarManager`].
pub struct TreeSitterParser<'a> {
    grammars: &'a GrammarManager,
}

impl<'a> TreeSitterParser<'a> {
    pub fn new(grammars: &'a GrammarManager) -> Self {
        Self { grammars }
    }

    /// Parse `source` as `language`. Returns `Ok(None)` if the language has
    /// no grammar (caller should fall back to line-based chunking); returns
    /// `Err` only on an actual tree-sitter parser failure, which per the
    /// chunker's contract also triggers the same fallback at the call site.
    pub fn parse(&self, language: Language, source: &str) -> Result<Option<Tree>> {
        let grammar = match self.grammars.get_grammar(language) {
            Some(g) => g,
            None => return Ok(None),
        };

        let mut parser = Parser::new();
        parser
            .set_language(&grammar)
            .map_err(|e| anyhow!("failed to set tree-sitter language: {e}"))?;

        Ok(parser.parse(source, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_rust() {
        let grammars = GrammarManager::new();
        let parser = TreeSitterParser::new(&grammars);
        let tree = parser
            .parse(Language::Rust, "fn main() {}")
            .unwrap()
            .unwrap();
        assert!(!tree.root_node().has_error());
    }

    #[test]
    fn unsupported_language_returns_none() {
        let grammars = GrammarManager::new();
        let parser = TreeSitterParser::new(&grammars);
        assert!(parser.parse(Language::Markdown, "# hi").unwrap().is_none());
    }
}
