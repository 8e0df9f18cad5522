use std::path::Path;

/// A source language recognized by the chunker and grammar loader.
///
/// `Other` covers every extension that isn't one of the structured
/// languages above — files of that kind are still walked and, if textual,
/// fall back to line-based chunking rather than being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    C,
    Cpp,
    CSharp,
    Go,
    Java,
    Markdown,
    Json,
    Other,
}

impl Language {
    /// Detect a language from a file's extension. Case-insensitive.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("rs") => Language::Rust,
            Some("py" | "pyi") => Language::Python,
            Some("js" | "jsx" | "mjs" | "cjs") => Language::JavaScript,
            Some("ts" | "tsx" | "mts" | "cts") => Language::TypeScript,
            Some("c" | "h") => Language::C,
            Some("cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx") => Language::Cpp,
            Some("cs") => Language::CSharp,
            Some("go") => Language::Go,
            Some("java") => Language::Java,
            Some("md" | "markdown") => Language::Markdown,
            Some("json") => Language::Json,
            _ => Language::Other,
        }
    }

    /// Human-readable name used in summaries and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "Rust",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::CSharp => "C#",
            Language::Go => "Go",
            Language::Java => "Java",
            Language::Markdown => "Markdown",
            Language::Json => "JSON",
            Language::Other => "Other",
        }
    }

    /// Whether this language has a tree-sitter grammar and AST extractor,
    /// i.e. whether the chunker can produce structural (non-fallback)
    /// chunks for it.
    pub fn has_ast_support(&self) -> bool {
        matches!(
            self,
            Language::Rust
                | Language::Python
                | Language::JavaScript
                | Language::TypeScript
                | Language::C
                | Language::Cpp
                | Language::CSharp
                | Language::Go
                | Language::Java
        )
    }

    /// Whether files of this language should be indexed at all. `Other`
    /// is still indexable (via line-based fallback chunking) as long as
    /// the file is textual — binary detection happens separately.
    pub fn is_indexable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_known_extensions() {
        assert_eq!(Language::from_path(&PathBuf::from("a.rs")), Language::Rust);
        assert_eq!(
            Language::from_path(&PathBuf::from("a.py")),
            Language::Python
        );
        assert_eq!(
            Language::from_path(&PathBuf::from("a.tsx")),
            Language::TypeScript
        );
        assert_eq!(
            Language::from_path(&PathBuf::from("a.JAVA")),
            Language::Java
        );
    }

    #[test]
    fn unknown_extension_is_other() {
        assert_eq!(
            Language::from_path(&PathBuf::from("a.xyz")),
            Language::Other
        );
        assert_eq!(Language::from_path(&PathBuf::from("noext")), Language::Other);
    }

    #[test]
    fn ast_support_matches_extractor_coverage() {
        assert!(Language::Rust.has_ast_support());
        assert!(!Language::Markdown.has_ast_support());
        assert!(!Language::Other.has_ast_support());
    }
}
