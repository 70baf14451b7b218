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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use crate::access::{Actor, PermissionLevel};
    use crate::config::Config;
    use crate::engine::TenderEngine;
    use crate::error::EngineError;
    use crate::llm::mock::{MockCompletion, MockEmbedding};
    use crate::proposal::types::{SectionStatus, SourceDocument, TenderSection};

    const OWNER_ORG: &str = "acme";

    fn owner() -> Actor {
        Actor::new("alice", OWNER_ORG)
    }

    fn collaborator() -> Actor {
        Actor::new("eve", "rival-org")
    }

    async fn open_engine(completion: Arc<MockCompletion>) -> TenderEngine {
        let dir = std::env::temp_dir().join(format!("tendercore-test-{}", uuid::Uuid::new_v4()));
        let embedding = Arc::new(MockEmbedding::new(8));
        TenderEngine::open(Config::default(), embedding, completion, &dir)
            .await
            .unwrap()
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn section(id: &str, title: &str, requirement: &str, mandatory: bool, position: i32) -> TenderSection {
        TenderSection {
            id: id.to_string(),
            key: id.to_string(),
            title: title.to_string(),
            requirement: requirement.to_string(),
            mandatory,
            position,
        }
    }

    /// Two mandatory sections with requirements short enough to skip
    /// chunking; drafting then exercises the empty-context degradation
    fn sample_document() -> SourceDocument {
        let now = Utc::now();
        SourceDocument {
            id: "tender-1".to_string(),
            title: "Road Maintenance Services".to_string(),
            sector: "Infrastructure".to_string(),
            issuing_authority: "City Works Department".to_string(),
            estimated_value: "2,400,000 EUR".to_string(),
            description: String::new(),
            sections: vec![
                section(
                    "eligibility",
                    "Eligibility Criteria",
                    "Bidders must demonstrate three years of relevant experience.",
                    true,
                    1,
                ),
                section(
                    "technical",
                    "Technical Specifications",
                    "Describe the maintenance methodology and equipment fleet.",
                    true,
                    2,
                ),
            ],
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup_proposal(engine: &TenderEngine) -> String {
        engine.ingest_document(&sample_document()).await.unwrap();
        let proposal = engine
            .create_proposal("tender-1", OWNER_ORG)
            .await
            .unwrap();
        proposal.id
    }

    #[tokio::test]
    async fn test_denied_edit_makes_no_model_call() {
        let completion = Arc::new(MockCompletion::returning("should never be returned"));
        let engine = open_engine(completion.clone()).await;
        let proposal_id = setup_proposal(&engine).await;

        engine
            .assign_user(
                &proposal_id,
                "eligibility",
                "eve",
                PermissionLevel::ReadAndComment,
                &owner(),
            )
            .await
            .unwrap();

        let denied = engine
            .generate_section_draft(&proposal_id, "eligibility", &collaborator(), None)
            .await;

        match denied {
            Err(EngineError::Forbidden { required, actual }) => {
                assert_eq!(required, PermissionLevel::Edit);
                assert_eq!(actual, Some(PermissionLevel::ReadAndComment));
            }
            other => panic!("expected Forbidden, got {:?}", other.map(|d| d.word_count)),
        }

        assert_eq!(completion.calls(), 0, "denied drafts must not reach the model");
    }

    #[tokio::test]
    async fn test_unassigned_user_is_denied_outright() {
        let completion = Arc::new(MockCompletion::returning("unused"));
        let engine = open_engine(completion.clone()).await;
        let proposal_id = setup_proposal(&engine).await;

        let denied = engine
            .generate_section_draft(&proposal_id, "eligibility", &collaborator(), None)
            .await;

        assert!(matches!(
            denied,
            Err(EngineError::Forbidden { actual: None, .. })
        ));
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_owner_draft_appends_activity() {
        let completion = Arc::new(MockCompletion::returning(
            "We confirm [COMPANY NAME] meets the stated criteria through documented experience.",
        ));
        let engine = open_engine(completion.clone()).await;
        let proposal_id = setup_proposal(&engine).await;

        let draft = engine
            .generate_section_draft(&proposal_id, "eligibility", &owner(), None)
            .await
            .unwrap();

        assert!(draft.word_count > 0);
        assert_eq!(completion.calls(), 1);

        let activity = engine.activity(&proposal_id, &owner()).await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].action, "draft_generated");
        assert_eq!(activity[0].user_id, "alice");
        assert_eq!(activity[0].word_count, draft.word_count);
    }

    #[tokio::test]
    async fn test_edit_assignment_allows_drafting() {
        let completion = Arc::new(MockCompletion::returning("A grounded draft."));
        let engine = open_engine(completion.clone()).await;
        let proposal_id = setup_proposal(&engine).await;

        engine
            .assign_user(
                &proposal_id,
                "technical",
                "eve",
                PermissionLevel::Edit,
                &owner(),
            )
            .await
            .unwrap();

        let draft = engine
            .generate_section_draft(&proposal_id, "technical", &collaborator(), None)
            .await
            .unwrap();

        assert!(draft.word_count > 0);
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn test_assignment_replaces_previous_level() {
        let completion = Arc::new(MockCompletion::returning("unused"));
        let engine = open_engine(completion).await;
        let proposal_id = setup_proposal(&engine).await;

        // At most one active permission per (section, user): the later
        // grant replaces the earlier one
        engine
            .assign_user(
                &proposal_id,
                "technical",
                "eve",
                PermissionLevel::Edit,
                &owner(),
            )
            .await
            .unwrap();
        engine
            .assign_user(
                &proposal_id,
                "technical",
                "eve",
                PermissionLevel::ReadOnly,
                &owner(),
            )
            .await
            .unwrap();

        let level = engine
            .authorize(
                &proposal_id,
                Some("technical"),
                &collaborator(),
                crate::access::Action::View,
            )
            .await
            .unwrap();
        assert_eq!(level, PermissionLevel::ReadOnly);
    }

    #[tokio::test]
    async fn test_owner_level_cannot_be_assigned() {
        let completion = Arc::new(MockCompletion::returning("unused"));
        let engine = open_engine(completion).await;
        let proposal_id = setup_proposal(&engine).await;

        let rejected = engine
            .assign_user(
                &proposal_id,
                "technical",
                "eve",
                PermissionLevel::Owner,
                &owner(),
            )
            .await;

        assert!(matches!(rejected, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_remove_missing_assignment_is_not_found() {
        let completion = Arc::new(MockCompletion::returning("unused"));
        let engine = open_engine(completion).await;
        let proposal_id = setup_proposal(&engine).await;

        engine
            .assign_user(
                &proposal_id,
                "technical",
                "eve",
                PermissionLevel::Edit,
                &owner(),
            )
            .await
            .unwrap();

        engine
            .remove_assignment(&proposal_id, "technical", "eve", &owner())
            .await
            .unwrap();

        let missing = engine
            .remove_assignment(&proposal_id, "technical", "eve", &owner())
            .await;
        assert!(matches!(missing, Err(EngineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_validate_requires_owner() {
        let completion = Arc::new(MockCompletion::returning("unused"));
        let engine = open_engine(completion.clone()).await;
        let proposal_id = setup_proposal(&engine).await;

        engine
            .assign_user(
                &proposal_id,
                "technical",
                "eve",
                PermissionLevel::Edit,
                &owner(),
            )
            .await
            .unwrap();

        let denied = engine.validate_proposal(&proposal_id, &collaborator()).await;

        match denied {
            Err(EngineError::Forbidden { required, actual }) => {
                assert_eq!(required, PermissionLevel::Owner);
                assert_eq!(actual, Some(PermissionLevel::ReadOnly));
            }
            _ => panic!("expected Forbidden"),
        }
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_validate_empty_mandatory_sections_fail() {
        let completion = Arc::new(MockCompletion::returning("unused"));
        let engine = open_engine(completion.clone()).await;
        let proposal_id = setup_proposal(&engine).await;

        let result = engine
            .validate_proposal(&proposal_id, &owner())
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert_eq!(result.score, 0.0);
        for section in &result.sections {
            assert_eq!(section.status, SectionStatus::Missing);
            assert_eq!(section.score, 0.0);
        }
        // Missing sections are scored by the length floor alone
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_validate_full_compliance() {
        let completion = Arc::new(MockCompletion::scripted(vec![
            r#"{"score": 90, "status": "complete", "gaps": [], "suggestions": []}"#.to_string(),
            r#"{"score": 85, "status": "complete", "gaps": [], "suggestions": []}"#.to_string(),
        ]));
        let engine = open_engine(completion.clone()).await;
        let proposal_id = setup_proposal(&engine).await;

        for section_id in ["eligibility", "technical"] {
            engine
                .save_proposal_section(&proposal_id, section_id, &words(250), &owner())
                .await
                .unwrap();
        }

        let result = engine
            .validate_proposal(&proposal_id, &owner())
            .await
            .unwrap();

        assert!(result.is_valid);
        assert!((result.score - 87.5).abs() < 0.01);
        assert!(result
            .sections
            .iter()
            .all(|s| s.status == SectionStatus::Complete));
        assert_eq!(completion.calls(), 2);
    }

    #[tokio::test]
    async fn test_reingestion_is_idempotent() {
        let completion = Arc::new(MockCompletion::returning("unused"));
        let engine = open_engine(completion).await;

        let mut document = sample_document();
        document.sections[0].requirement = words(60);
        document.sections[1].requirement = words(45);

        let first = engine.ingest_document(&document).await.unwrap();
        assert_eq!(first.chunks_created, 2);
        assert!(!first.was_cached);

        let second = engine.ingest_document(&document).await.unwrap();
        assert!(second.was_cached);
        assert_eq!(second.chunks_created, 0);

        let stats = engine.index_stats().await.unwrap();
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_chunks, 2, "no duplication, no residue");
    }

    #[tokio::test]
    async fn test_reingestion_rebuilds_edited_documents() {
        let completion = Arc::new(MockCompletion::returning("unused"));
        let engine = open_engine(completion).await;

        let mut document = sample_document();
        document.sections[0].requirement = words(60);
        document.sections[1].requirement = words(45);
        engine.ingest_document(&document).await.unwrap();

        // Edit drops one section below the indexing threshold
        document.sections[1].requirement = words(10);
        let result = engine.ingest_document(&document).await.unwrap();

        assert!(!result.was_cached);
        assert_eq!(result.chunks_created, 1);

        let stats = engine.index_stats().await.unwrap();
        assert_eq!(stats.total_chunks, 1, "old chunk set fully replaced");
    }

    #[tokio::test]
    async fn test_search_unknown_document_is_not_found() {
        let completion = Arc::new(MockCompletion::returning("unused"));
        let engine = open_engine(completion).await;

        let missing = engine.search_document("anything", "no-such-doc", None).await;
        assert!(matches!(missing, Err(EngineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_draft_survives_empty_chunk_index() {
        // Requirements below the chunking threshold leave no chunks; the
        // drafter must degrade to "no additional context" instead of
        // erroring
        let completion = Arc::new(MockCompletion::returning("Draft without retrieval context."));
        let engine = open_engine(completion.clone()).await;
        let proposal_id = setup_proposal(&engine).await;

        let draft = engine
            .generate_section_draft(&proposal_id, "technical", &owner(), Some("Keep it short"))
            .await
            .unwrap();

        assert_eq!(draft.content, "Draft without retrieval context.");
        assert_eq!(completion.calls(), 1);
    }
}
