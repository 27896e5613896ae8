#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod ranking;
pub mod segment;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use segment::Segmenter;
pub use traits::{Embedder, VectorIndex};
pub use types::{
    check_partition_name, Chunk, CodeLanguage, ContentKind, IndexItem, ItemId, Meta, ProseFormat, ScoredItem,
    SourceKind,
};
