//! Per-user vector index over uploaded document chunks.

pub mod chunk;
mod ingest;
mod lance;
mod types;

pub use ingest::IndexPipeline;
pub use lance::LanceIndex;
pub use types::ChunkRecord;
