use std::path::Path;
use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator,
    StringArray, TimestampMicrosecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use uuid::Uuid;

use crate::auth::UserId;
use crate::error::{DocentError, Result};
use crate::index::types::ChunkRecord;

const EMBEDDING_DIMENSIONS: i32 = 384;
const CHUNKS_TABLE: &str = "chunks";

/// LanceDB-backed chunk index, partitioned per user via row filters.
pub struct LanceIndex {
    connection: Connection,
    chunks_table: Option<Table>,
}

impl LanceIndex {
    pub async fn connect(path: &Path) -> Result<Self> {
        let uri = path
            .to_str()
            .ok_or_else(|| DocentError::Index("Invalid path encoding".to_string()))?;

        let connection = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| DocentError::Index(format!("Failed to connect to LanceDB: {e}")))?;

        Ok(Self {
            connection,
            chunks_table: None,
        })
    }

    fn chunks_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("page", DataType::Int32, false),
            Field::new("content", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    EMBEDDING_DIMENSIONS,
                ),
                false,
            ),
            Field::new(
                "created_at",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
        ]))
    }

    fn create_empty_batch(schema: Arc<Schema>) -> RecordBatch {
        let empty_strings: Vec<Option<&str>> = vec![];
        let empty_ints: Vec<i32> = vec![];
        let empty_timestamps: Vec<i64> = vec![];
        let empty_embeddings: Vec<Option<Vec<Option<f32>>>> = vec![];

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(empty_strings.clone())),
                Arc::new(StringArray::from(empty_strings.clone())),
                Arc::new(StringArray::from(empty_strings.clone())),
                Arc::new(StringArray::from(empty_strings.clone())),
                Arc::new(Int32Array::from(empty_ints)),
                Arc::new(StringArray::from(empty_strings)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(empty_embeddings, EMBEDDING_DIMENSIONS)),
                Arc::new(TimestampMicrosecondArray::from(empty_timestamps).with_timezone("UTC")),
            ],
        )
        .expect("Schema matches columns")
    }

    pub async fn create_chunks_table(&mut self) -> Result<()> {
        let schema = Self::chunks_schema();
        let batch = Self::create_empty_batch(schema.clone());
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let table = self
            .connection
            .create_table(CHUNKS_TABLE, Box::new(batches))
            .execute()
            .await
            .map_err(|e| DocentError::Index(format!("Failed to create chunks table: {e}")))?;

        self.chunks_table = Some(table);
        Ok(())
    }

    pub async fn open_chunks_table(&mut self) -> Result<()> {
        let table = self
            .connection
            .open_table(CHUNKS_TABLE)
            .execute()
            .await
            .map_err(|e| DocentError::Index(format!("Failed to open chunks table: {e}")))?;

        self.chunks_table = Some(table);
        Ok(())
    }

    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DocentError::Index(format!("Failed to list tables: {e}")))?;

        Ok(names.contains(&name.to_string()))
    }

    /// Open the chunks table, creating it on first run.
    pub async fn ensure_chunks_table(&mut self) -> Result<()> {
        if self.table_exists(CHUNKS_TABLE).await? {
            self.open_chunks_table().await
        } else {
            self.create_chunks_table().await
        }
    }

    fn table(&self) -> Result<&Table> {
        self.chunks_table
            .as_ref()
            .ok_or_else(|| DocentError::Index("Chunks table not initialized".to_string()))
    }

    /// Convert ChunkRecord structs to an Arrow RecordBatch
    fn chunks_to_batch(chunks: &[ChunkRecord], schema: Arc<Schema>) -> Result<RecordBatch> {
        let ids: Vec<String> = chunks.iter().map(|c| c.id.to_string()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        let user_ids: Vec<&str> = chunks.iter().map(|c| c.user_id.as_str()).collect();
        let document_ids: Vec<&str> = chunks.iter().map(|c| c.document_id.as_str()).collect();
        let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
        let pages: Vec<i32> = chunks.iter().map(|c| c.page).collect();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();

        let embeddings: Vec<Option<Vec<Option<f32>>>> = chunks
            .iter()
            .map(|c| Some(c.embedding.iter().map(|&v| Some(v)).collect()))
            .collect();

        let created_at: Vec<i64> = chunks
            .iter()
            .map(|c| c.created_at.timestamp_micros())
            .collect();

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(id_refs)),
                Arc::new(StringArray::from(user_ids)),
                Arc::new(StringArray::from(document_ids)),
                Arc::new(StringArray::from(sources)),
                Arc::new(Int32Array::from(pages)),
                Arc::new(StringArray::from(contents)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(embeddings, EMBEDDING_DIMENSIONS)),
                Arc::new(TimestampMicrosecondArray::from(created_at).with_timezone("UTC")),
            ],
        )
        .map_err(|e| DocentError::Index(format!("Failed to create RecordBatch: {e}")))
    }

    /// Convert an Arrow RecordBatch row back to a ChunkRecord
    fn batch_to_chunk(batch: &RecordBatch, row: usize) -> Result<ChunkRecord> {
        let id_array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DocentError::Index("Failed to get id column".to_string()))?;

        let user_id_array = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DocentError::Index("Failed to get user_id column".to_string()))?;

        let document_id_array = batch
            .column(2)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DocentError::Index("Failed to get document_id column".to_string()))?;

        let source_array = batch
            .column(3)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DocentError::Index("Failed to get source column".to_string()))?;

        let page_array = batch
            .column(4)
            .as_any()
            .downcast_ref::<Int32Array>()
            .ok_or_else(|| DocentError::Index("Failed to get page column".to_string()))?;

        let content_array = batch
            .column(5)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| DocentError::Index("Failed to get content column".to_string()))?;

        let embedding_array = batch
            .column(6)
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .ok_or_else(|| DocentError::Index("Failed to get embedding column".to_string()))?;

        let created_at_array = batch
            .column(7)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .ok_or_else(|| DocentError::Index("Failed to get created_at column".to_string()))?;

        let id = Uuid::parse_str(id_array.value(row))
            .map_err(|e| DocentError::Index(format!("Failed to parse UUID: {e}")))?;

        let embedding_list = embedding_array.value(row);
        let embedding_values = embedding_list
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| DocentError::Index("Failed to get embedding values".to_string()))?;
        let embedding: Vec<f32> = (0..embedding_values.len())
            .map(|i| embedding_values.value(i))
            .collect();

        let created_at = Utc
            .timestamp_micros(created_at_array.value(row))
            .single()
            .ok_or_else(|| {
                DocentError::Index("Failed to parse created_at timestamp".to_string())
            })?;

        Ok(ChunkRecord {
            id,
            user_id: user_id_array.value(row).to_string(),
            document_id: document_id_array.value(row).to_string(),
            source: source_array.value(row).to_string(),
            page: page_array.value(row),
            content: content_array.value(row).to_string(),
            embedding,
            created_at,
        })
    }

    /// Insert chunks in batch
    pub async fn insert_batch(&self, chunks: &[ChunkRecord]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let table = self.table()?;
        let schema = Self::chunks_schema();
        let batch = Self::chunks_to_batch(chunks, schema.clone())?;
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| DocentError::Index(format!("Failed to insert chunks: {e}")))?;

        Ok(())
    }

    /// Search a user's chunks by vector similarity (ANN search)
    pub async fn search(
        &self,
        user: &UserId,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let table = self.table()?;

        let query = table
            .query()
            .nearest_to(embedding)
            .map_err(|e| DocentError::Index(format!("Failed to create vector query: {e}")))?
            .limit(limit)
            .only_if(format!("user_id = '{}'", user.as_str()));

        let stream = query
            .execute()
            .await
            .map_err(|e| DocentError::Index(format!("Failed to execute search: {e}")))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| DocentError::Index(format!("Failed to collect search results: {e}")))?;

        let mut chunks = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                chunks.push(Self::batch_to_chunk(batch, row)?);
            }
        }

        Ok(chunks)
    }

    /// Delete every chunk in a user's namespace
    pub async fn delete_user(&self, user: &UserId) -> Result<()> {
        let table = self.table()?;

        table
            .delete(&format!("user_id = '{}'", user.as_str()))
            .await
            .map_err(|e| DocentError::Index(format!("Failed to delete user chunks: {e}")))?;

        Ok(())
    }

    /// Total number of indexed chunks across all users
    pub async fn count(&self) -> Result<usize> {
        let table = self.table()?;

        table
            .count_rows(None)
            .await
            .map_err(|e| DocentError::Index(format!("Failed to count rows: {e}")))
    }
}
