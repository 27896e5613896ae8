//! Retrieval coordination and the retrieve-then-generate pipeline.

pub mod coordinator;
pub mod pipeline;

pub use coordinator::{IngestReport, RetrievalCoordinator};
pub use pipeline::{RagPipeline, RagResponse};
