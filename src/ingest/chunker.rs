use crate::config::ChunkingConfig;
use crate::ingest::types::{ChunkContext, ContentChunk};

/// Splits tender text into overlapping word windows. Pure: no side
/// effects, no failure modes beyond empty input producing an empty list.
pub struct DocumentChunker {
    config: ChunkingConfig,
}

impl DocumentChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Chunk text into successive windows of `window_words` words,
    /// advancing by `window_words - overlap_words` each step. The final
    /// partial window is included when it still covers unseen words.
    /// Text under `min_words` is skipped entirely.
    pub fn chunk(&self, text: &str, context: &ChunkContext) -> Vec<ContentChunk> {
        let words: Vec<&str> = text.split_whitespace().collect();

        if words.len() < self.config.min_words {
            return Vec::new();
        }

        let window = self.config.window_words.max(1);
        // Overlap must leave room for the window to advance
        let overlap = self.config.overlap_words.min(window - 1);
        let stride = window - overlap;

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut chunk_index = 0i32;

        while start < words.len() {
            let end = (start + window).min(words.len());

            chunks.push(ContentChunk {
                id: uuid::Uuid::new_v4().to_string(),
                document_id: context.document_id.clone(),
                section_id: context.section_id.clone(),
                section_type: context.section_type,
                mandatory: context.mandatory,
                chunk_index,
                word_start: start,
                word_end: end,
                content: words[start..end].join(" "),
            });

            if end == words.len() {
                break;
            }

            start += stride;
            chunk_index += 1;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::SectionType;

    fn context() -> ChunkContext {
        ChunkContext {
            document_id: "doc-1".to_string(),
            section_id: Some("sec-1".to_string()),
            section_type: SectionType::Technical,
            mandatory: true,
        }
    }

    fn chunker(window: usize, overlap: usize, min: usize) -> DocumentChunker {
        DocumentChunker::new(ChunkingConfig {
            window_words: window,
            overlap_words: overlap,
            min_words: min,
        })
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_input_produces_no_chunks() {
        assert!(chunker(512, 50, 40).chunk("", &context()).is_empty());
    }

    #[test]
    fn test_below_minimum_is_skipped() {
        let text = words(39);
        assert!(chunker(512, 50, 40).chunk(&text, &context()).is_empty());
    }

    #[test]
    fn test_short_text_yields_single_chunk() {
        let text = words(100);
        let chunks = chunker(512, 50, 40).chunk(&text, &context());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_start, 0);
        assert_eq!(chunks[0].word_end, 100);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].content, text);
    }

    #[test]
    fn test_full_word_coverage() {
        let total = 1200;
        let text = words(total);
        let chunks = chunker(512, 50, 40).chunk(&text, &context());

        let mut covered = vec![false; total];
        for chunk in &chunks {
            for slot in &mut covered[chunk.word_start..chunk.word_end] {
                *slot = true;
            }
        }
        assert!(covered.iter().all(|c| *c), "every word must be covered");
    }

    #[test]
    fn test_consecutive_chunks_overlap_exactly() {
        let text = words(1200);
        let chunks = chunker(512, 50, 40).chunk(&text, &context());

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let overlap = pair[0].word_end.saturating_sub(pair[1].word_start);
            assert_eq!(overlap, 50, "consecutive chunks must overlap by 50 words");
        }
    }

    #[test]
    fn test_window_advances_by_stride() {
        let text = words(1500);
        let chunks = chunker(512, 50, 40).chunk(&text, &context());

        for pair in chunks.windows(2) {
            assert_eq!(pair[1].word_start - pair[0].word_start, 462);
        }

        // Every chunk except the last is exactly one window wide
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.word_end - chunk.word_start, 512);
        }
    }

    #[test]
    fn test_final_partial_window_included() {
        // 600 words: second window covers 462..600, shorter than 512
        let text = words(600);
        let chunks = chunker(512, 50, 40).chunk(&text, &context());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].word_start, 462);
        assert_eq!(chunks[1].word_end, 600);
    }

    #[test]
    fn test_chunks_inherit_metadata() {
        let text = words(100);
        let chunks = chunker(512, 50, 40).chunk(&text, &context());

        assert_eq!(chunks[0].document_id, "doc-1");
        assert_eq!(chunks[0].section_id.as_deref(), Some("sec-1"));
        assert_eq!(chunks[0].section_type, SectionType::Technical);
        assert!(chunks[0].mandatory);
    }
}
