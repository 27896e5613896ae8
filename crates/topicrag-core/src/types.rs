//! Domain types shared by segmentation, the index seam, and retrieval.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

pub type ItemId = String;
pub type Meta = HashMap<String, String>;

/// Top-level shape of a chunk's source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Prose,
    Code,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Prose => f.write_str("prose"),
            SourceKind::Code => f.write_str("code"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProseFormat {
    Pdf,
    PlainText,
    Markdown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CodeLanguage {
    Python,
    JavaScript,
    TypeScript,
    Php,
}

impl CodeLanguage {
    pub fn tag(self) -> &'static str {
        match self {
            CodeLanguage::Python => "py",
            CodeLanguage::JavaScript => "js",
            CodeLanguage::TypeScript => "ts",
            CodeLanguage::Php => "php",
        }
    }
}

impl ProseFormat {
    pub fn tag(self) -> &'static str {
        match self {
            ProseFormat::Pdf => "pdf",
            ProseFormat::PlainText => "txt",
            ProseFormat::Markdown => "md",
        }
    }
}

/// Declared content kind of an input document.
///
/// The set is closed: anything that cannot be mapped onto one of these
/// variants is rejected with [`Error::UnsupportedFormat`] before any
/// segmentation happens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "format", rename_all = "snake_case")]
pub enum ContentKind {
    Prose(ProseFormat),
    Code(CodeLanguage),
}

impl ContentKind {
    /// Map a bare extension (`"pdf"`, `"py"`, ...) to a content kind.
    pub fn from_extension(ext: &str) -> Result<Self> {
        let kind = match ext.to_ascii_lowercase().as_str() {
            "pdf" => ContentKind::Prose(ProseFormat::Pdf),
            "txt" => ContentKind::Prose(ProseFormat::PlainText),
            "md" => ContentKind::Prose(ProseFormat::Markdown),
            "py" => ContentKind::Code(CodeLanguage::Python),
            "js" => ContentKind::Code(CodeLanguage::JavaScript),
            "ts" => ContentKind::Code(CodeLanguage::TypeScript),
            "php" => ContentKind::Code(CodeLanguage::Php),
            other => return Err(Error::UnsupportedFormat(other.to_string())),
        };
        Ok(kind)
    }

    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(filename.to_string()))?;
        Self::from_extension(ext)
    }

    /// Parse a `(kind, subkind)` pair such as `("prose", "md")` or `("code", "ts")`.
    pub fn parse(kind: &str, subkind: &str) -> Result<Self> {
        let parsed = Self::from_extension(subkind)
            .map_err(|_| Error::UnsupportedFormat(format!("{kind}/{subkind}")))?;
        match (kind.to_ascii_lowercase().as_str(), parsed) {
            ("prose", ContentKind::Prose(_)) | ("code", ContentKind::Code(_)) => Ok(parsed),
            _ => Err(Error::UnsupportedFormat(format!("{kind}/{subkind}"))),
        }
    }

    pub fn source_kind(self) -> SourceKind {
        match self {
            ContentKind::Prose(_) => SourceKind::Prose,
            ContentKind::Code(_) => SourceKind::Code,
        }
    }

    pub fn format_tag(self) -> &'static str {
        match self {
            ContentKind::Prose(format) => format.tag(),
            ContentKind::Code(language) => language.tag(),
        }
    }
}

/// Partition names double as LanceDB table names, so they are restricted to
/// ASCII letters, digits, `_`, `-` and `.`.
pub fn check_partition_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidPartitionName(name.to_string()))
    }
}

/// An ordered unit of text produced by segmentation.
///
/// - `text`: never empty or whitespace-only
/// - `sequence_index`: position within the source document
/// - `source_kind`: prose or code
/// - `origin_metadata`: filename, topic, language and similar provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub sequence_index: usize,
    pub source_kind: SourceKind,
    pub origin_metadata: Meta,
}

/// A `(identifier, vector, text, metadata)` record handed to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexItem {
    pub id: ItemId,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: Meta,
}

/// One ranked retrieval record.
///
/// `score` is cosine similarity in [-1, 1], higher is better. `seq` is the
/// item's insertion position across the whole index and breaks score ties,
/// both inside a partition and when partitions are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub id: ItemId,
    pub text: String,
    pub score: f32,
    pub metadata: Meta,
    pub partition: String,
    pub seq: u64,
}
