//! Walks a tree-sitter AST and collects definition nodes with enough
//! metadata (name, signature, docstring, breadcrumb context) for the
//! semantic chunker to turn each one into a [`super::Chunk`].

use tree_sitter::Node;

use super::extractor::{collect_member_symbols, LanguageExtractor};
use super::ChunkKind;

/// A definition found while walking the tree, not yet split or deduped.
pub struct RawDefinition<'tree> {
    pub node: Node<'tree>,
    pub kind: ChunkKind,
    pub name: Option<String>,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    /// Breadcrumb trail of enclosing definitions, outermost first
    /// (e.g. `["Module: server", "Impl: Server"]`).
    pub context: Vec<String>,
    /// Method/member symbol names nested under this definition, populated
    /// only for container kinds (class, struct, impl, trait, interface).
    pub symbols: Vec<String>,
}

fn is_container_kind(kind: ChunkKind) -> bool {
    matches!(
        kind,
        ChunkKind::Class | ChunkKind::Struct | ChunkKind::Impl | ChunkKind::Trait | ChunkKind::Interface
    )
}

/// Depth-first walk collecting every definition node, recursing into
/// children of both definition and non-definition nodes so that nested
/// definitions (a method inside an impl block, a closure assigned to a
/// const) are all discovered. Definitions do not nest inside each other in
/// the output — a method's `context` records its enclosing impl/class, but
/// the impl/class itself is emitted as its own definition when it carries
/// a name.
pub fn collect_definitions<'tree>(
    root: Node<'tree>,
    source: &[u8],
    extractor: &dyn LanguageExtractor,
) -> Vec<RawDefinition<'tree>> {
    let mut out = Vec::new();
    walk(root, source, extractor, &mut Vec::new(), &mut out);
    out
}

fn walk<'tree>(
    node: Node<'tree>,
    source: &[u8],
    extractor: &dyn LanguageExtractor,
    breadcrumbs: &mut Vec<String>,
    out: &mut Vec<RawDefinition<'tree>>,
) {
    let is_def = extractor.is_definition(node);

    if is_def {
        let kind = extractor.classify(node);
        let name = extractor.extract_name(node, source);
        let signature = extractor.extract_signature(node, source);
        let docstring = extractor.extract_docstring(node, source);
        let symbols = if is_container_kind(kind) {
            let mut symbols = collect_member_symbols(node, source, extractor);
            if let Some(n) = &name {
                if !symbols.contains(n) {
                    symbols.push(n.clone());
                }
            }
            symbols
        } else {
            Vec::new()
        };

        out.push(RawDefinition {
            node,
            kind,
            name: name.clone(),
            signature,
            docstring,
            context: breadcrumbs.clone(),
            symbols,
        });

        if let Some(label) = extractor.build_label(node, source) {
            breadcrumbs.push(label);
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, extractor, breadcrumbs, out);
    }

    if is_def && extractor.build_label(node, source).is_some() {
        breadcrumbs.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::extractor::get_extractor;
    use crate::file::Language;
    use tree_sitter::Parser;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn collects_top_level_function() {
        let source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let tree = parse(source);
        let extractor = get_extractor(Language::Rust).unwrap();
        let defs = collect_definitions(tree.root_node(), source.as_bytes(), extractor.as_ref());
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].kind, ChunkKind::Function);
        assert_eq!(defs[0].name.as_deref(), Some("add"));
    }

    #[test]
    fn nested_method_records_impl_as_context() {
        let source = "struct Foo;\nimpl Foo { fn bar(&self) {} }";
        let tree = parse(source);
        let extractor = get_extractor(Language::Rust).unwrap();
        let defs = collect_definitions(tree.root_node(), source.as_bytes(), extractor.as_ref());

        let method = defs
            .iter()
            .find(|d| d.kind == ChunkKind::Function && d.name.as_deref() == Some("bar"))
            .expect("method bar should be found");
        assert!(method.context.iter().any(|c| c.contains("Foo")));
    }
}
