//! Segmentation of raw document bytes into ordered [`Chunk`]s.
//!
//! Dispatch is a match over [`ContentKind`]: prose formats go through
//! paragraph splitting (PDFs are flattened page by page first), code goes
//! through definition extraction with a pattern fallback. Once a kind has
//! been resolved nothing here fails; odd input yields fewer chunks.

pub mod code;
pub mod pdf;
pub mod prose;
pub mod window;

use std::borrow::Cow;

use tracing::debug;

use crate::config::SegmentSettings;
use crate::error::Result;
use crate::types::{Chunk, ContentKind, Meta, ProseFormat};

#[derive(Debug, Clone)]
pub struct Segmenter {
    cfg: SegmentSettings,
}

impl Segmenter {
    pub fn new(cfg: SegmentSettings) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Segment `content` of an already-resolved kind.
    pub fn segment(&self, content: &[u8], kind: ContentKind) -> Vec<Chunk> {
        let texts = match kind {
            ContentKind::Prose(ProseFormat::Pdf) => pdf::extract_pages(content)
                .iter()
                .flat_map(|page| prose::segment_prose(page, &self.cfg))
                .collect(),
            ContentKind::Prose(ProseFormat::PlainText | ProseFormat::Markdown) => {
                prose::segment_prose(&decode(content), &self.cfg)
            }
            ContentKind::Code(language) => code::segment_code(&decode(content), language),
        };
        debug!(kind = kind.format_tag(), chunks = texts.len(), "segmented");
        into_chunks(texts, kind)
    }

    /// Segment by `(kind, subkind)` tags, e.g. `("prose", "md")`.
    pub fn segment_tagged(&self, content: &[u8], kind: &str, subkind: &str) -> Result<Vec<Chunk>> {
        Ok(self.segment(content, ContentKind::parse(kind, subkind)?))
    }

    /// Segment with the kind inferred from the filename extension.
    pub fn segment_file(&self, content: &[u8], filename: &str) -> Result<Vec<Chunk>> {
        Ok(self.segment(content, ContentKind::from_filename(filename)?))
    }

    /// Fixed-window split for long text without paragraph structure.
    pub fn window(&self, text: &str) -> Vec<String> {
        window::split_windows(text, self.cfg.chunk_size, self.cfg.overlap)
    }
}

fn decode(content: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(content)
}

fn into_chunks(texts: Vec<String>, kind: ContentKind) -> Vec<Chunk> {
    texts
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .enumerate()
        .map(|(sequence_index, text)| {
            let mut origin_metadata = Meta::new();
            origin_metadata.insert("kind".to_string(), kind.source_kind().to_string());
            origin_metadata.insert("format".to_string(), kind.format_tag().to_string());
            origin_metadata.insert("sequence_index".to_string(), sequence_index.to_string());
            Chunk { text, sequence_index, source_kind: kind.source_kind(), origin_metadata }
        })
        .collect()
}
