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

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::access::{Action, Actor, PermissionAuthority, PermissionLevel};
use crate::config::Config;
use crate::drafting::{GroundedDrafter, SectionDraft};
use crate::error::EngineError;
use crate::ingest::ingestor::DocumentIngestor;
use crate::ingest::store::ChunkStore;
use crate::ingest::types::{IndexStats, IngestResult};
use crate::llm::{CompletionProvider, EmbeddingProvider, HttpModelClient};
use crate::proposal::store::ProposalStore;
use crate::proposal::types::{
    ActivityLogEntry, Assignment, Proposal, ProposalSection, ProposalValidation, SourceDocument,
};
use crate::retrieval::{RetrievedContext, Retriever};
use crate::sections::SectionType;
use crate::validation::ProposalValidator;

/// Wires stores, providers and components into the caller-facing
/// operations. Every mutating or generative operation authorizes the
/// actor before any retrieval or model call happens.
pub struct TenderEngine {
    store: ProposalStore,
    chunks: Arc<ChunkStore>,
    ingestor: DocumentIngestor,
    retriever: Retriever,
    drafter: GroundedDrafter,
    validator: ProposalValidator,
}

impl TenderEngine {
    /// Open the engine against a database path with explicit providers.
    /// The embedding provider is probed once to learn the vector
    /// dimension the chunk table is created with.
    pub async fn open(
        config: Config,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        completion_provider: Arc<dyn CompletionProvider>,
        db_path: &Path,
    ) -> Result<Self, EngineError> {
        std::fs::create_dir_all(db_path).map_err(|e| EngineError::Storage(e.into()))?;

        let db = lancedb::connect(db_path.to_str().ok_or_else(|| {
            EngineError::InvalidInput("database path is not valid UTF-8".to_string())
        })?)
        .execute()
        .await
        .map_err(|e| EngineError::Storage(e.into()))?;

        let probe = embedding_provider.embed("dimension probe").await?;
        let vector_dim = probe.len();

        let chunks = Arc::new(ChunkStore::new(db.clone(), vector_dim).await?);
        let store = ProposalStore::new(db).await?;

        let ingestor = DocumentIngestor::new(
            config.chunking.clone(),
            chunks.clone(),
            embedding_provider.clone(),
            config.model.embed_delay_ms,
        );

        let retriever = Retriever::new(
            chunks.clone(),
            embedding_provider.clone(),
            config.retrieval.top_k,
        );

        let drafter = GroundedDrafter::new(
            Retriever::new(
                chunks.clone(),
                embedding_provider,
                config.retrieval.top_k,
            ),
            completion_provider.clone(),
            config.model.clone(),
        );

        let validator = ProposalValidator::new(completion_provider, config.scoring.clone());

        Ok(Self {
            store,
            chunks,
            ingestor,
            retriever,
            drafter,
            validator,
        })
    }

    /// Open with the HTTP model client and the system storage directory
    pub async fn with_defaults(config: Config) -> Result<Self, EngineError> {
        let client = Arc::new(HttpModelClient::from_config(&config.model)?);
        let db_path = crate::storage::get_database_path()?;
        Self::open(config, client.clone(), client, &db_path).await
    }

    // --- documents ---

    /// Register a document and build its chunk index. Re-ingesting an
    /// edited document deletes and rebuilds the full chunk set.
    pub async fn ingest_document(
        &self,
        document: &SourceDocument,
    ) -> Result<IngestResult, EngineError> {
        if document.id.trim().is_empty() || document.title.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "document id and title are required".to_string(),
            ));
        }

        self.store.put_document(document).await?;
        self.ingestor.ingest(document).await
    }

    /// Delete a document row and its entire chunk set
    pub async fn delete_document(&self, document_id: &str) -> Result<(), EngineError> {
        self.require_document(document_id).await?;
        self.store.delete_document(document_id).await?;
        self.chunks.delete_document(document_id).await?;
        Ok(())
    }

    pub async fn list_documents(&self) -> Result<Vec<SourceDocument>, EngineError> {
        Ok(self.store.list_documents().await?)
    }

    /// Semantic search over one document's chunks (operator surface)
    pub async fn search_document(
        &self,
        query: &str,
        document_id: &str,
        section_type: Option<SectionType>,
    ) -> Result<RetrievedContext, EngineError> {
        self.require_document(document_id).await?;
        self.retriever.retrieve(query, document_id, section_type).await
    }

    // --- proposals ---

    pub async fn create_proposal(
        &self,
        document_id: &str,
        owner_org_id: &str,
    ) -> Result<Proposal, EngineError> {
        self.require_document(document_id).await?;

        if owner_org_id.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "owner organization id is required".to_string(),
            ));
        }

        let proposal = Proposal::new(document_id, owner_org_id);
        self.store.put_proposal(&proposal).await?;
        Ok(proposal)
    }

    /// Save a section response on behalf of the actor; requires Edit on
    /// that section
    pub async fn save_proposal_section(
        &self,
        proposal_id: &str,
        section_id: &str,
        content: &str,
        actor: &Actor,
    ) -> Result<ProposalSection, EngineError> {
        let proposal = self.require_proposal(proposal_id).await?;
        self.authorize_on(&proposal, actor, Some(section_id), Action::EditSection)
            .await?;

        let document = self.require_document(&proposal.document_id).await?;
        if document.section(section_id).is_none() {
            return Err(EngineError::not_found("section", section_id));
        }

        let section = ProposalSection::new(proposal_id, section_id, content);
        self.store.upsert_proposal_section(&section).await?;
        Ok(section)
    }

    // --- drafting ---

    /// Draft grounded content for one section. The actor needs Edit on
    /// the section; the permission check runs before any retrieval or
    /// model call. A successful draft appends one activity log entry.
    pub async fn generate_section_draft(
        &self,
        proposal_id: &str,
        section_id: &str,
        actor: &Actor,
        custom_instructions: Option<&str>,
    ) -> Result<SectionDraft, EngineError> {
        let proposal = self.require_proposal(proposal_id).await?;
        self.authorize_on(&proposal, actor, Some(section_id), Action::Draft)
            .await?;

        let document = self.require_document(&proposal.document_id).await?;
        let section = document
            .section(section_id)
            .ok_or_else(|| EngineError::not_found("section", section_id))?;

        let draft = self
            .drafter
            .draft(&document, section, custom_instructions)
            .await?;

        self.store
            .append_activity(&ActivityLogEntry::draft_generated(
                proposal_id,
                section_id,
                &actor.user_id,
                draft.word_count,
            ))
            .await?;

        info!(
            proposal_id,
            section_id,
            user_id = %actor.user_id,
            words = draft.word_count,
            "section draft generated"
        );

        Ok(draft)
    }

    // --- validation ---

    /// Whole-proposal compliance validation; Owner only
    pub async fn validate_proposal(
        &self,
        proposal_id: &str,
        actor: &Actor,
    ) -> Result<ProposalValidation, EngineError> {
        let proposal = self.require_proposal(proposal_id).await?;
        self.authorize_on(&proposal, actor, None, Action::Validate)
            .await?;

        let document = self.require_document(&proposal.document_id).await?;

        let responses: HashMap<String, ProposalSection> = self
            .store
            .sections_for_proposal(proposal_id)
            .await?
            .into_iter()
            .map(|s| (s.section_id.clone(), s))
            .collect();

        self.validator.validate(&document, &responses).await
    }

    // --- assignments ---

    /// Grant a user a permission level on one section; Owner only.
    /// Owner itself is implicit to the owning organization and cannot be
    /// granted through an assignment.
    pub async fn assign_user(
        &self,
        proposal_id: &str,
        section_id: &str,
        user_id: &str,
        level: PermissionLevel,
        actor: &Actor,
    ) -> Result<Assignment, EngineError> {
        if level == PermissionLevel::Owner {
            return Err(EngineError::InvalidInput(
                "owner level is implicit to the proposal's organization and cannot be assigned"
                    .to_string(),
            ));
        }
        if user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("user id is required".to_string()));
        }

        let proposal = self.require_proposal(proposal_id).await?;
        self.authorize_on(&proposal, actor, None, Action::ManageAssignments)
            .await?;

        let document = self.require_document(&proposal.document_id).await?;
        if document.section(section_id).is_none() {
            return Err(EngineError::not_found("section", section_id));
        }

        let assignment = Assignment::new(proposal_id, section_id, user_id, level);
        self.store.put_assignment(&assignment).await?;
        Ok(assignment)
    }

    /// Remove a user's assignment from one section; Owner only
    pub async fn remove_assignment(
        &self,
        proposal_id: &str,
        section_id: &str,
        user_id: &str,
        actor: &Actor,
    ) -> Result<(), EngineError> {
        let proposal = self.require_proposal(proposal_id).await?;
        self.authorize_on(&proposal, actor, None, Action::ManageAssignments)
            .await?;

        let removed = self
            .store
            .remove_assignment(proposal_id, section_id, user_id)
            .await?;

        if !removed {
            return Err(EngineError::not_found(
                "assignment",
                format!("{}/{}/{}", proposal_id, section_id, user_id),
            ));
        }

        Ok(())
    }

    /// Resolve and enforce the actor's level for an arbitrary action;
    /// exposed for the transport layer's comment/view gating
    pub async fn authorize(
        &self,
        proposal_id: &str,
        section_id: Option<&str>,
        actor: &Actor,
        action: Action,
    ) -> Result<PermissionLevel, EngineError> {
        let proposal = self.require_proposal(proposal_id).await?;
        self.authorize_on(&proposal, actor, section_id, action).await
    }

    // --- activity / stats ---

    /// Drafting activity for a proposal, newest first; any assignee or
    /// the owner may read it
    pub async fn activity(
        &self,
        proposal_id: &str,
        actor: &Actor,
    ) -> Result<Vec<ActivityLogEntry>, EngineError> {
        let proposal = self.require_proposal(proposal_id).await?;
        self.authorize_on(&proposal, actor, None, Action::View).await?;
        Ok(self.store.activity_for_proposal(proposal_id).await?)
    }

    pub async fn index_stats(&self) -> Result<IndexStats, EngineError> {
        Ok(self.chunks.get_stats().await?)
    }

    // --- helpers ---

    async fn authorize_on(
        &self,
        proposal: &Proposal,
        actor: &Actor,
        section_id: Option<&str>,
        action: Action,
    ) -> Result<PermissionLevel, EngineError> {
        let assignments = self
            .store
            .assignments_for_user(&proposal.id, &actor.user_id)
            .await?;
        PermissionAuthority::authorize(proposal, actor, section_id, &assignments, action)
    }

    async fn require_proposal(&self, proposal_id: &str) -> Result<Proposal, EngineError> {
        self.store
            .get_proposal(proposal_id)
            .await?
            .ok_or_else(|| EngineError::not_found("proposal", proposal_id))
    }

    async fn require_document(&self, document_id: &str) -> Result<SourceDocument, EngineError> {
        self.store
            .get_document(document_id)
            .await?
            .ok_or_else(|| EngineError::not_found("document", document_id))
    }
}
