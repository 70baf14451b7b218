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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::EngineError;

/// One text in, one fixed-length vector out. Errors propagate as
/// ingestion/retrieval failures.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError>;
}

/// Single request/response contract against the external language model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, EngineError>;
}

/// Client for an OpenAI-compatible API exposing /embeddings and
/// /chat/completions.
pub struct HttpModelClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    completion_model: String,
}

impl HttpModelClient {
    pub fn from_config(config: &ModelConfig) -> Result<Self, EngineError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            EngineError::InvalidInput(format!(
                "missing API key: set the {} environment variable",
                config.api_key_env
            ))
        })?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .user_agent("Tendercore/0.2")
            .build()
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            embedding_model: config.embedding_model.clone(),
            completion_model: config.completion_model.clone(),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl EmbeddingProvider for HttpModelClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(format!("embedding request: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::UpstreamUnavailable(format!(
                "embedding endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(format!("embedding response: {}", e)))?;

        body.data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| {
                EngineError::UpstreamUnavailable("embedding endpoint returned no vectors".into())
            })
    }
}

#[async_trait]
impl CompletionProvider for HttpModelClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, EngineError> {
        let request = ChatRequest {
            model: &self.completion_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(format!("completion request: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngineError::UpstreamUnavailable(format!(
                "completion endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(format!("completion response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                EngineError::UpstreamUnavailable("completion endpoint returned no choices".into())
            })
    }
}
