//! Index row types

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::UserId;

/// One indexed chunk of an uploaded document.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Unique identifier for this chunk
    pub id: Uuid,
    /// Owning user's namespace
    pub user_id: String,
    /// Document this chunk was extracted from
    pub document_id: String,
    /// Basename of the originating file, reported back as a source
    pub source: String,
    /// Zero-based page number within the document
    pub page: i32,
    /// Chunk text
    pub content: String,
    /// Vector embedding (384 dimensions)
    pub embedding: Vec<f32>,
    /// When this chunk was indexed
    pub created_at: DateTime<Utc>,
}

impl ChunkRecord {
    pub fn new(
        user: &UserId,
        document_id: impl Into<String>,
        source: impl Into<String>,
        page: i32,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user.as_str().to_string(),
            document_id: document_id.into(),
            source: source.into(),
            page,
            content: content.into(),
            embedding,
            created_at: Utc::now(),
        }
    }
}
