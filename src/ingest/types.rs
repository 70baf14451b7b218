use serde::{Deserialize, Serialize};

use crate::sections::SectionType;

/// Metadata inherited by every chunk produced from one piece of text
#[derive(Debug, Clone)]
pub struct ChunkContext {
    pub document_id: String,
    pub section_id: Option<String>,
    pub section_type: SectionType,
    pub mandatory: bool,
}

/// A bounded segment of tender text, the unit of retrieval. The chunk set
/// for a document is fully regenerated on re-ingestion; partial updates
/// are not supported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentChunk {
    pub id: String,
    pub document_id: String,
    pub section_id: Option<String>,
    pub section_type: SectionType,
    pub mandatory: bool,
    pub chunk_index: i32,
    pub word_start: usize,
    pub word_end: usize,
    pub content: String,
}

/// Search hit with relevance score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: ContentChunk,
    pub relevance_score: f32,
}

/// Result of a document ingestion run
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub document_id: String,
    pub chunks_created: usize,
    pub was_cached: bool,
}

/// Statistics about the chunk index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_chunks: usize,
}
