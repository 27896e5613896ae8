//! Definition-level chunking for source code.
//!
//! Languages with a tree-sitter grammar get their top-level function and
//! class/type definitions extracted verbatim. A parse that reports syntax
//! errors, and any language without a grammar, go through the same
//! pattern-based splitter instead.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use tree_sitter::{Language, Node, Parser};

use crate::types::CodeLanguage;

static PYTHON_INTRODUCERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:async\s+)?def\s+\w+|\bclass\s+\w+").expect("python introducers")
});

static SCRIPT_INTRODUCERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:async\s+)?function\b\s*\*?\s*\w+\s*\(|\bclass\s+\w+").expect("js/ts introducers")
});

static PHP_INTRODUCERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfunction\s+&?\w+\s*\(|\b(?:abstract\s+|final\s+)?class\s+\w+").expect("php introducers")
});

fn grammar(language: CodeLanguage) -> Option<Language> {
    match language {
        CodeLanguage::Python => Some(tree_sitter_python::LANGUAGE.into()),
        CodeLanguage::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        CodeLanguage::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        CodeLanguage::Php => None,
    }
}

fn introducers(language: CodeLanguage) -> &'static Regex {
    match language {
        CodeLanguage::Python => &PYTHON_INTRODUCERS,
        CodeLanguage::JavaScript | CodeLanguage::TypeScript => &SCRIPT_INTRODUCERS,
        CodeLanguage::Php => &PHP_INTRODUCERS,
    }
}

fn is_definition(language: CodeLanguage, node: Node<'_>) -> bool {
    let kind = node.kind();
    match language {
        CodeLanguage::Python => matches!(kind, "function_definition" | "class_definition" | "decorated_definition"),
        CodeLanguage::JavaScript | CodeLanguage::TypeScript => {
            if kind == "export_statement" {
                return node
                    .child_by_field_name("declaration")
                    .is_some_and(|decl| is_definition(language, decl));
            }
            matches!(
                kind,
                "function_declaration" | "generator_function_declaration" | "class_declaration"
            ) || (language == CodeLanguage::TypeScript
                && matches!(
                    kind,
                    "abstract_class_declaration"
                        | "interface_declaration"
                        | "type_alias_declaration"
                        | "enum_declaration"
                ))
        }
        CodeLanguage::Php => false,
    }
}

/// Top-level definitions in declaration order, or `None` when there is no
/// grammar for the language or the source does not parse cleanly.
pub fn parse_definitions(source: &str, language: CodeLanguage) -> Option<Vec<String>> {
    let grammar = grammar(language)?;
    let mut parser = Parser::new();
    parser.set_language(&grammar).ok()?;
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();
    if root.has_error() {
        debug!(language = language.tag(), "syntax errors, using pattern fallback");
        return None;
    }
    let mut cursor = root.walk();
    let definitions = root
        .named_children(&mut cursor)
        .filter(|node| is_definition(language, *node))
        .filter_map(|node| node.utf8_text(source.as_bytes()).ok())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    Some(definitions)
}

/// Spans from each function/class introducer to the next one (or end of
/// input), trimmed. Text before the first introducer is not emitted.
pub fn split_by_introducers(source: &str, language: CodeLanguage) -> Vec<String> {
    let starts: Vec<usize> = introducers(language).find_iter(source).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(source.len());
            source[start..end].trim()
        })
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn segment_code(source: &str, language: CodeLanguage) -> Vec<String> {
    match parse_definitions(source, language) {
        Some(definitions) => definitions,
        None => split_by_introducers(source, language),
    }
}
