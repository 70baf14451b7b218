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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::PermissionLevel;

/// A published or uploaded tender. Immutable once ingested; edits go
/// through full re-ingestion, never partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub title: String,
    pub sector: String,
    pub issuing_authority: String,
    /// Presentation-formatted value string, passed through verbatim
    pub estimated_value: String,
    /// Free-form overview text outside the structured sections
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sections: Vec<TenderSection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SourceDocument {
    pub fn section(&self, section_id: &str) -> Option<&TenderSection> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    /// Sections in their declared order
    pub fn ordered_sections(&self) -> Vec<&TenderSection> {
        let mut sections: Vec<&TenderSection> = self.sections.iter().collect();
        sections.sort_by_key(|s| s.position);
        sections
    }
}

/// A named, ordered subdivision of a tender document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderSection {
    pub id: String,
    pub key: String,
    pub title: String,
    /// The requirement text bidders must respond to
    pub requirement: String,
    pub mandatory: bool,
    pub position: i32,
}

/// A bidder's response artifact, tied one-to-one to a SourceDocument and
/// owned exclusively by the bidder organization that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub document_id: String,
    pub owner_org_id: String,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn new(document_id: impl Into<String>, owner_org_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            owner_org_id: owner_org_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Free-text response to one tender section, word count derived on write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalSection {
    pub id: String,
    pub proposal_id: String,
    pub section_id: String,
    pub content: String,
    pub word_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl ProposalSection {
    pub fn new(
        proposal_id: impl Into<String>,
        section_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            proposal_id: proposal_id.into(),
            section_id: section_id.into(),
            word_count: content.split_whitespace().count(),
            content,
            updated_at: Utc::now(),
        }
    }
}

/// Grants one user one permission level on one proposal section.
/// At most one active row per (section, user); adding replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub proposal_id: String,
    pub section_id: String,
    pub user_id: String,
    pub level: PermissionLevel,
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(
        proposal_id: impl Into<String>,
        section_id: impl Into<String>,
        user_id: impl Into<String>,
        level: PermissionLevel,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            proposal_id: proposal_id.into(),
            section_id: section_id.into(),
            user_id: user_id.into(),
            level,
            created_at: Utc::now(),
        }
    }
}

/// Append-only record of a drafting action; never mutated or deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub proposal_id: String,
    pub section_id: String,
    pub user_id: String,
    pub action: String,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn draft_generated(
        proposal_id: impl Into<String>,
        section_id: impl Into<String>,
        user_id: impl Into<String>,
        word_count: usize,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            proposal_id: proposal_id.into(),
            section_id: section_id.into(),
            user_id: user_id.into(),
            action: "draft_generated".to_string(),
            word_count,
            created_at: Utc::now(),
        }
    }
}

/// Per-section compliance judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionStatus {
    Missing,
    Incomplete,
    NeedsImprovement,
    Complete,
}

impl SectionStatus {
    pub fn parse(s: &str) -> Option<SectionStatus> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "missing" => Some(SectionStatus::Missing),
            "incomplete" => Some(SectionStatus::Incomplete),
            "needs_improvement" => Some(SectionStatus::NeedsImprovement),
            "complete" => Some(SectionStatus::Complete),
            _ => None,
        }
    }
}

impl std::fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionStatus::Missing => write!(f, "missing"),
            SectionStatus::Incomplete => write!(f, "incomplete"),
            SectionStatus::NeedsImprovement => write!(f, "needs_improvement"),
            SectionStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Compliance judgment for one section. Ephemeral: computed on demand,
/// never persisted as source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionValidation {
    pub section_id: String,
    pub title: String,
    pub mandatory: bool,
    pub status: SectionStatus,
    pub score: f32,
    pub gaps: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Aggregated proposal compliance result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalValidation {
    pub is_valid: bool,
    pub score: f32,
    pub sections: Vec<SectionValidation>,
    pub unaddressed_requirements: Vec<String>,
}
