//! Document ingestion pipeline
//!
//! Orchestrates the upload-side flow: text extraction, chunking, embedding
//! generation, and storage in the per-user index.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

use crate::auth::UserId;
use crate::config::RetrievalConfig;
use crate::embedding::TextEmbedder;
use crate::error::Result;
use crate::extract::extract_blocks;
use crate::index::chunk::split_text;
use crate::index::lance::LanceIndex;
use crate::index::types::ChunkRecord;

/// Pipeline for indexing uploaded documents.
pub struct IndexPipeline {
    index: Arc<TokioMutex<LanceIndex>>,
    embedder: Arc<dyn TextEmbedder>,
    config: RetrievalConfig,
}

impl IndexPipeline {
    pub fn new(
        index: Arc<TokioMutex<LanceIndex>>,
        embedder: Arc<dyn TextEmbedder>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            config,
        }
    }

    /// Extract, chunk, embed and index one stored document.
    ///
    /// Returns the number of chunks indexed. Documents whose extracted text
    /// is empty index zero chunks, which is not an error.
    pub async fn ingest_document(
        &self,
        user: &UserId,
        document_id: &str,
        path: &Path,
    ) -> Result<usize> {
        let blocks = extract_blocks(path).await?;

        let mut texts = Vec::new();
        let mut provenance = Vec::new();
        for block in &blocks {
            for chunk in split_text(&block.content, self.config.chunk_size, self.config.chunk_overlap)
            {
                provenance.push((block.source.clone(), block.page));
                texts.push(chunk);
            }
        }

        if texts.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(&texts)?;

        let records: Vec<ChunkRecord> = texts
            .into_iter()
            .zip(embeddings)
            .zip(provenance)
            .map(|((content, embedding), (source, page))| {
                ChunkRecord::new(user, document_id, source, page as i32, content, embedding)
            })
            .collect();

        let count = records.len();
        self.index.lock().await.insert_batch(&records).await?;

        tracing::debug!(
            user = %user,
            document_id,
            chunks = count,
            "indexed document"
        );

        Ok(count)
    }

    /// Drop every index row in a user's namespace.
    pub async fn clear_user(&self, user: &UserId) -> Result<()> {
        self.index.lock().await.delete_user(user).await
    }
}
