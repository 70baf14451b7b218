// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use tracing::debug;

use crate::error::EngineError;
use crate::ingest::store::ChunkStore;
use crate::ingest::types::ScoredChunk;
use crate::llm::EmbeddingProvider;
use crate::sections::SectionType;

/// Retrieved context for one query: concatenated chunk text, most
/// relevant first, plus the chunks themselves
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    pub context: String,
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievedContext {
    pub fn empty() -> Self {
        Self {
            context: String::new(),
            chunks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Semantic search over a document's chunk set
pub struct Retriever {
    store: Arc<ChunkStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        store: Arc<ChunkStore>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedding_provider,
            top_k,
        }
    }

    /// Embed the query and return the top-K most similar chunks for the
    /// document. A document with no chunks (ingestion never ran, or was
    /// aborted) yields an empty context rather than an error: grounded
    /// generation degrades to "no additional context available".
    pub async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
        section_type: Option<SectionType>,
    ) -> Result<RetrievedContext, EngineError> {
        let query_embedding = self.embedding_provider.embed(query).await?;

        let chunks = self
            .store
            .search(&query_embedding, document_id, section_type, self.top_k)
            .await?;

        if chunks.is_empty() {
            debug!(
                document_id,
                ?section_type,
                "no chunks matched, returning empty context"
            );
            return Ok(RetrievedContext::empty());
        }

        let context = chunks
            .iter()
            .map(|c| c.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        Ok(RetrievedContext { context, chunks })
    }
}
