use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ChunkingConfig;
use crate::error::EngineError;
use crate::ingest::chunker::DocumentChunker;
use crate::ingest::store::ChunkStore;
use crate::ingest::types::{ChunkContext, ContentChunk, IngestResult};
use crate::llm::EmbeddingProvider;
use crate::proposal::types::SourceDocument;
use crate::sections::SectionType;

/// Turns a tender document into an indexed chunk set: chunk, embed,
/// swap. Embedding calls run sequentially with an inter-call delay to
/// stay under provider rate limits; one failed call aborts the whole run
/// before the store is touched, so the previous chunk set stays intact.
pub struct DocumentIngestor {
    chunker: DocumentChunker,
    store: Arc<ChunkStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    embed_delay: Duration,
    // Re-ingesting the same document concurrently with itself would
    // interleave the delete-then-insert swap; serialize it.
    swap_lock: Mutex<()>,
}

impl DocumentIngestor {
    pub fn new(
        chunking: ChunkingConfig,
        store: Arc<ChunkStore>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        embed_delay_ms: u64,
    ) -> Self {
        Self {
            chunker: DocumentChunker::new(chunking),
            store,
            embedding_provider,
            embed_delay: Duration::from_millis(embed_delay_ms),
            swap_lock: Mutex::new(()),
        }
    }

    /// Ingest or re-ingest a document. A content-hash match against the
    /// stored chunk set short-circuits the run entirely.
    pub async fn ingest(&self, document: &SourceDocument) -> Result<IngestResult, EngineError> {
        let content_hash = Self::content_hash(document);

        if let Some(stored_hash) = self.store.document_hash(&document.id).await? {
            if stored_hash == content_hash {
                debug!(document_id = %document.id, "document content unchanged, skipping ingestion");
                return Ok(IngestResult {
                    document_id: document.id.clone(),
                    chunks_created: 0,
                    was_cached: true,
                });
            }
        }

        let chunks = self.chunk_document(document);

        let mut embeddings = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.embed_delay).await;
            }
            // Any failure here surfaces before the swap below; the prior
            // chunk set is never half-replaced.
            embeddings.push(self.embedding_provider.embed(&chunk.content).await?);
        }

        {
            let _guard = self.swap_lock.lock().await;
            self.store
                .replace_document(&document.id, &content_hash, &chunks, &embeddings)
                .await?;
        }

        if let Err(e) = self.store.ensure_optimal_index().await {
            tracing::warn!(error = %e, "vector index optimization failed");
        }

        info!(
            document_id = %document.id,
            chunks = chunks.len(),
            "document ingested"
        );

        Ok(IngestResult {
            document_id: document.id.clone(),
            chunks_created: chunks.len(),
            was_cached: false,
        })
    }

    /// Chunk the overview text plus every structured section, each chunk
    /// tagged with its section's metadata
    fn chunk_document(&self, document: &SourceDocument) -> Vec<ContentChunk> {
        let mut chunks = Vec::new();
        let mut next_index = 0i32;

        if !document.description.trim().is_empty() {
            let context = ChunkContext {
                document_id: document.id.clone(),
                section_id: None,
                section_type: SectionType::General,
                mandatory: false,
            };
            next_index = self.append_chunks(&mut chunks, &document.description, &context, next_index);
        }

        for section in document.ordered_sections() {
            let context = ChunkContext {
                document_id: document.id.clone(),
                section_id: Some(section.id.clone()),
                section_type: SectionType::classify(&section.title),
                mandatory: section.mandatory,
            };
            next_index = self.append_chunks(&mut chunks, &section.requirement, &context, next_index);
        }

        chunks
    }

    fn append_chunks(
        &self,
        chunks: &mut Vec<ContentChunk>,
        text: &str,
        context: &ChunkContext,
        next_index: i32,
    ) -> i32 {
        let mut produced = self.chunker.chunk(text, context);
        for (offset, chunk) in produced.iter_mut().enumerate() {
            chunk.chunk_index = next_index + offset as i32;
        }
        let count = produced.len() as i32;
        chunks.extend(produced);
        next_index + count
    }

    /// SHA-256 over the text that feeds the chunker, so the freshness
    /// check tracks exactly what gets indexed
    fn content_hash(document: &SourceDocument) -> String {
        let mut hasher = Sha256::new();
        hasher.update(document.title.as_bytes());
        hasher.update(document.description.as_bytes());
        for section in &document.sections {
            hasher.update(section.key.as_bytes());
            hasher.update(section.requirement.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
