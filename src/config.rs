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

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Chunking configuration for document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Sliding window size in words
    pub window_words: usize,
    /// Overlap between consecutive windows in words
    pub overlap_words: usize,
    /// Text shorter than this is not indexed at all
    pub min_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_words: 512,
            overlap_words: 50,
            min_words: 40,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks returned per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Validation scoring thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Normalized aggregate score required for a proposal to be valid
    pub validity_threshold: f32,
    /// Responses under this word count are MISSING
    pub missing_word_floor: usize,
    /// Responses under this word count are INCOMPLETE
    pub brief_word_floor: usize,
    /// Heuristic path: word count at which a response is COMPLETE
    pub complete_word_floor: usize,
    /// Weight of optional sections relative to mandatory ones
    pub optional_weight: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            validity_threshold: 70.0,
            missing_word_floor: 50,
            brief_word_floor: 100,
            complete_word_floor: 200,
            optional_weight: 0.5,
        }
    }
}

/// External model endpoint configuration (OpenAI-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub embedding_model: String,
    pub completion_model: String,
    /// Drafting temperature: non-zero for phrasing variation, low enough
    /// to keep grounding tight
    pub temperature: f32,
    pub max_tokens: u32,
    /// Inter-call delay during ingestion to avoid provider throttling
    pub embed_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "TENDERCORE_API_KEY".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            completion_model: "gpt-4o-mini".to_string(),
            temperature: 0.4,
            max_tokens: 1600,
            embed_delay_ms: 200,
            request_timeout_secs: 60,
        }
    }
}

/// Main configuration for tendercore
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl Config {
    /// Load configuration from config.toml file
    /// First tries to load from system config directory, falls back to embedded template
    pub fn load() -> Result<Self> {
        let config_path = crate::storage::get_system_config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Config doesn't exist, create from template
            let template_content = include_str!("../config-templates/default.toml");
            let config: Self = toml::from_str(template_content)?;

            // Save to system config directory
            if let Some(parent) = config_path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&config_path, template_content)?;

            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_template_matches_defaults() {
        let template: Config =
            toml::from_str(include_str!("../config-templates/default.toml")).unwrap();
        let defaults = Config::default();

        assert_eq!(
            template.chunking.window_words,
            defaults.chunking.window_words
        );
        assert_eq!(
            template.chunking.overlap_words,
            defaults.chunking.overlap_words
        );
        assert_eq!(template.retrieval.top_k, defaults.retrieval.top_k);
        assert_eq!(
            template.scoring.validity_threshold,
            defaults.scoring.validity_threshold
        );
        assert_eq!(template.model.embed_delay_ms, defaults.model.embed_delay_ms);
    }
}
