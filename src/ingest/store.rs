use anyhow::Result;
use std::sync::Arc;

use arrow_array::{
    Array, BooleanArray, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    index::Index,
    query::{ExecutableQuery, QueryBase},
    Connection, DistanceType,
};

use crate::ingest::types::{ContentChunk, IndexStats, ScoredChunk};
use crate::sections::SectionType;
use crate::vector_optimizer::VectorOptimizer;

const CHUNKS_TABLE: &str = "content_chunks";

/// LanceDB-backed chunk storage with nearest-neighbor search
pub struct ChunkStore {
    db: Connection,
    vector_dim: usize,
}

impl ChunkStore {
    fn quote_filter_string(input: &str) -> String {
        input.replace('\'', "''")
    }

    pub async fn new(db: Connection, vector_dim: usize) -> Result<Self> {
        let store = Self { db, vector_dim };
        store.initialize_table().await?;
        Ok(store)
    }

    fn chunk_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("section_id", DataType::Utf8, true),
            Field::new("section_type", DataType::Utf8, false),
            Field::new("mandatory", DataType::Boolean, false),
            Field::new("chunk_index", DataType::Int32, false),
            Field::new("word_start", DataType::Int32, false),
            Field::new("word_end", DataType::Int32, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("content_hash", DataType::Utf8, false),
            Field::new("indexed_at", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.vector_dim as i32,
                ),
                false,
            ),
        ]))
    }

    async fn initialize_table(&self) -> Result<()> {
        let table_names = self.db.table_names().execute().await?;

        if !table_names.contains(&CHUNKS_TABLE.to_string()) {
            self.db
                .create_empty_table(CHUNKS_TABLE, self.chunk_schema())
                .execute()
                .await?;
        }

        Ok(())
    }

    /// Replace the full chunk set for a document: delete everything under
    /// the document id, then insert the new batch. Callers must compute
    /// all embeddings before invoking, so a failed embedding never leaves
    /// a half-written chunk set behind.
    pub async fn replace_document(
        &self,
        document_id: &str,
        content_hash: &str,
        chunks: &[ContentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        anyhow::ensure!(
            chunks.len() == embeddings.len(),
            "chunk/embedding count mismatch: {} vs {}",
            chunks.len(),
            embeddings.len()
        );

        self.delete_document(document_id).await?;

        if chunks.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();

        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let document_ids: Vec<&str> = chunks.iter().map(|_| document_id).collect();
        let section_ids: Vec<Option<&str>> =
            chunks.iter().map(|c| c.section_id.as_deref()).collect();
        let section_types: Vec<&str> = chunks.iter().map(|c| c.section_type.as_str()).collect();
        let mandatory_flags: Vec<bool> = chunks.iter().map(|c| c.mandatory).collect();
        let chunk_indices: Vec<i32> = chunks.iter().map(|c| c.chunk_index).collect();
        let word_starts: Vec<i32> = chunks.iter().map(|c| c.word_start as i32).collect();
        let word_ends: Vec<i32> = chunks.iter().map(|c| c.word_end as i32).collect();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let content_hashes: Vec<&str> = chunks.iter().map(|_| content_hash).collect();
        let indexed_ats: Vec<&str> = chunks.iter().map(|_| now.as_str()).collect();

        let embedding_values: Vec<f32> =
            embeddings.iter().flat_map(|e| e.iter().copied()).collect();
        let embedding_array = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.vector_dim as i32,
            Arc::new(Float32Array::from(embedding_values)),
            None,
        )?;

        let schema = self.chunk_schema();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(document_ids)),
                Arc::new(StringArray::from(section_ids)),
                Arc::new(StringArray::from(section_types)),
                Arc::new(BooleanArray::from(mandatory_flags)),
                Arc::new(Int32Array::from(chunk_indices)),
                Arc::new(Int32Array::from(word_starts)),
                Arc::new(Int32Array::from(word_ends)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(content_hashes)),
                Arc::new(StringArray::from(indexed_ats)),
                Arc::new(embedding_array),
            ],
        )?;

        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;

        use arrow::record_batch::RecordBatchIterator;
        use std::iter::once;
        let batches = once(Ok(batch));
        let batch_reader = RecordBatchIterator::new(batches, schema);
        table.add(batch_reader).execute().await?;

        Ok(())
    }

    /// Nearest-neighbor search over one document's chunks, optionally
    /// narrowed to a section type. Smaller cosine distance means more
    /// relevant; results come back most relevant first.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        document_id: &str,
        section_type: Option<SectionType>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;

        let mut filter = format!(
            "document_id = '{}'",
            Self::quote_filter_string(document_id)
        );
        if let Some(section_type) = section_type {
            filter.push_str(&format!(" AND section_type = '{}'", section_type.as_str()));
        }

        let query = table
            .vector_search(query_embedding)?
            .distance_type(DistanceType::Cosine)
            .only_if(filter)
            .limit(limit);

        let mut results = query.execute().await?;
        let mut scored = Vec::new();

        while let Some(batch) = results.try_next().await? {
            if batch.num_rows() == 0 {
                continue;
            }

            let ids = string_column(&batch, "id");
            let document_ids = string_column(&batch, "document_id");
            let section_ids = string_column(&batch, "section_id");
            let section_types = string_column(&batch, "section_type");
            let mandatory_flags = batch
                .column_by_name("mandatory")
                .unwrap()
                .as_any()
                .downcast_ref::<BooleanArray>()
                .unwrap();
            let chunk_indices = int_column(&batch, "chunk_index");
            let word_starts = int_column(&batch, "word_start");
            let word_ends = int_column(&batch, "word_end");
            let contents = string_column(&batch, "content");
            let distances = batch
                .column_by_name("_distance")
                .unwrap()
                .as_any()
                .downcast_ref::<Float32Array>()
                .unwrap();

            for i in 0..batch.num_rows() {
                let section_id = if section_ids.is_null(i) {
                    None
                } else {
                    Some(section_ids.value(i).to_string())
                };

                let chunk = ContentChunk {
                    id: ids.value(i).to_string(),
                    document_id: document_ids.value(i).to_string(),
                    section_id,
                    section_type: SectionType::parse(section_types.value(i))
                        .unwrap_or(SectionType::General),
                    mandatory: mandatory_flags.value(i),
                    chunk_index: chunk_indices.value(i),
                    word_start: word_starts.value(i) as usize,
                    word_end: word_ends.value(i) as usize,
                    content: contents.value(i).to_string(),
                };

                scored.push(ScoredChunk {
                    chunk,
                    relevance_score: 1.0 - distances.value(i),
                });
            }
        }

        Ok(scored)
    }

    /// Content hash stored with a document's chunk set, if any
    pub async fn document_hash(&self, document_id: &str) -> Result<Option<String>> {
        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;

        let query = table
            .query()
            .only_if(format!(
                "document_id = '{}'",
                Self::quote_filter_string(document_id)
            ))
            .limit(1);

        let results = query.execute().await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        if batches.is_empty() || batches[0].num_rows() == 0 {
            return Ok(None);
        }

        let hashes = string_column(&batches[0], "content_hash");
        Ok(Some(hashes.value(0).to_string()))
    }

    pub async fn count_for_document(&self, document_id: &str) -> Result<usize> {
        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;
        let count = table
            .count_rows(Some(format!(
                "document_id = '{}'",
                Self::quote_filter_string(document_id)
            )))
            .await?;
        Ok(count)
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;
        table
            .delete(&format!(
                "document_id = '{}'",
                Self::quote_filter_string(document_id)
            ))
            .await?;
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<IndexStats> {
        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;
        let count = table.count_rows(None).await?;

        if count == 0 {
            return Ok(IndexStats {
                total_documents: 0,
                total_chunks: 0,
            });
        }

        let results = table.query().execute().await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        let mut unique_documents = std::collections::HashSet::new();
        for batch in batches {
            let document_ids = string_column(&batch, "document_id");
            for i in 0..batch.num_rows() {
                unique_documents.insert(document_ids.value(i).to_string());
            }
        }

        Ok(IndexStats {
            total_documents: unique_documents.len(),
            total_chunks: count,
        })
    }

    /// Create a vector index when the table has grown enough for one to
    /// beat brute-force scanning
    pub async fn ensure_optimal_index(&self) -> Result<()> {
        let table = self.db.open_table(CHUNKS_TABLE).execute().await?;

        let row_count = table.count_rows(None).await?;
        let has_index = table
            .list_indices()
            .await?
            .iter()
            .any(|idx| idx.columns == vec!["embedding"]);

        if has_index {
            return Ok(());
        }

        let index_params = VectorOptimizer::calculate_index_params(row_count, self.vector_dim);

        if !index_params.should_create_index {
            tracing::debug!(
                "Skipping index creation for {} rows - brute force will be faster",
                row_count
            );
            return Ok(());
        }

        tracing::info!(
            "Creating vector index for chunk table: {} rows, {} partitions, {} sub-vectors",
            row_count,
            index_params.num_partitions,
            index_params.num_sub_vectors
        );

        table
            .create_index(
                &["embedding"],
                Index::IvfPq(
                    lancedb::index::vector::IvfPqIndexBuilder::default()
                        .distance_type(index_params.distance_type)
                        .num_partitions(index_params.num_partitions)
                        .num_sub_vectors(index_params.num_sub_vectors)
                        .num_bits(index_params.num_bits as u32),
                ),
            )
            .execute()
            .await?;

        Ok(())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> &'a Int32Array {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap()
}
