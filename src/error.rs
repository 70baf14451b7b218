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

use thiserror::Error;

use crate::access::PermissionLevel;

/// Error surface of the engine. Permission and input errors are resolved
/// locally and never retried; upstream errors are retryable from the
/// caller's side since drafting has no persisted side effect besides the
/// activity log entry written on success.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("forbidden: requires {required}, actor holds {}", .actual.map(|l| l.to_string()).unwrap_or_else(|| "no access".to_string()))]
    Forbidden {
        required: PermissionLevel,
        actual: Option<PermissionLevel>,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream model unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("model output could not be structured: {0}")]
    Unparseable(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
