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

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::ScoringConfig;
use crate::error::EngineError;
use crate::llm::CompletionProvider;
use crate::proposal::types::{
    ProposalSection, ProposalValidation, SectionStatus, SectionValidation, SourceDocument,
    TenderSection,
};

const JUDGE_TEMPERATURE: f32 = 0.0;
const JUDGE_MAX_TOKENS: u32 = 600;
const MAX_UNADDRESSED: usize = 10;

/// Structured judgment the model is asked to return
#[derive(Debug, Deserialize)]
struct ModelJudgment {
    score: f32,
    status: String,
    #[serde(default)]
    gaps: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

/// Scores a proposal section-by-section against the source tender's
/// requirements. Two-tier: cheap word-count floors short-circuit before
/// any model call; a model judgment that fails or cannot be parsed
/// degrades to a deterministic length heuristic. Heuristic and model
/// scores are mutually exclusive per section, never blended.
pub struct ProposalValidator {
    completion_provider: Arc<dyn CompletionProvider>,
    scoring: ScoringConfig,
}

impl ProposalValidator {
    pub fn new(completion_provider: Arc<dyn CompletionProvider>, scoring: ScoringConfig) -> Self {
        Self {
            completion_provider,
            scoring,
        }
    }

    /// Validate every section of the source document (mandatory and
    /// optional) against the proposal's responses; an absent response is
    /// treated as an empty string.
    pub async fn validate(
        &self,
        document: &SourceDocument,
        responses: &HashMap<String, ProposalSection>,
    ) -> Result<ProposalValidation, EngineError> {
        let mut sections = Vec::new();

        for section in document.ordered_sections() {
            let content = responses
                .get(&section.id)
                .map(|r| r.content.as_str())
                .unwrap_or("");
            sections.push(self.score_section(section, content).await);
        }

        Ok(self.aggregate(sections))
    }

    async fn score_section(&self, section: &TenderSection, response: &str) -> SectionValidation {
        let words = response.split_whitespace().count();

        if words < self.scoring.missing_word_floor {
            return SectionValidation {
                section_id: section.id.clone(),
                title: section.title.clone(),
                mandatory: section.mandatory,
                status: SectionStatus::Missing,
                score: 0.0,
                gaps: vec![format!(
                    "No substantive response provided for \"{}\"",
                    section.title
                )],
                suggestions: vec![format!(
                    "Write a response addressing: {}",
                    truncate_words(&section.requirement, 30)
                )],
            };
        }

        if words < self.scoring.brief_word_floor {
            return SectionValidation {
                section_id: section.id.clone(),
                title: section.title.clone(),
                mandatory: section.mandatory,
                status: SectionStatus::Incomplete,
                score: 30.0,
                gaps: vec![format!(
                    "Response to \"{}\" is too brief to address the requirement",
                    section.title
                )],
                suggestions: vec![
                    "Expand the response with specifics for each stated requirement".to_string(),
                ],
            };
        }

        match self.judge_section(section, response).await {
            Ok(judgment) => self.from_judgment(section, judgment),
            Err(e) => {
                warn!(
                    section_id = %section.id,
                    error = %e,
                    "model judgment unavailable, falling back to length heuristic"
                );
                self.heuristic(section, words)
            }
        }
    }

    /// Ask the model for a structured judgment; both transport failures
    /// and unparseable output surface as errors for the caller to degrade
    async fn judge_section(
        &self,
        section: &TenderSection,
        response: &str,
    ) -> Result<ModelJudgment, EngineError> {
        let system_prompt = "You are a tender compliance reviewer. Compare a bidder's response \
             against a tender requirement and reply with a single JSON object only, no prose: \
             {\"score\": <0-100>, \"status\": \"complete\" | \"needs_improvement\" | \"incomplete\" | \"missing\", \
             \"gaps\": [<unaddressed requirement>], \"suggestions\": [<concrete improvement>]}";

        let user_prompt = format!(
            "Requirement ({}):\n{}\n\nResponse:\n{}",
            section.title, section.requirement, response
        );

        let raw = self
            .completion_provider
            .complete(
                system_prompt,
                &user_prompt,
                JUDGE_TEMPERATURE,
                JUDGE_MAX_TOKENS,
            )
            .await?;

        parse_judgment(&raw)
    }

    fn from_judgment(&self, section: &TenderSection, judgment: ModelJudgment) -> SectionValidation {
        let score = judgment.score.clamp(0.0, 100.0);
        let status = SectionStatus::parse(&judgment.status).unwrap_or({
            if score >= self.scoring.validity_threshold {
                SectionStatus::Complete
            } else {
                SectionStatus::NeedsImprovement
            }
        });

        SectionValidation {
            section_id: section.id.clone(),
            title: section.title.clone(),
            mandatory: section.mandatory,
            status,
            score,
            gaps: judgment.gaps,
            suggestions: judgment.suggestions,
        }
    }

    /// Deterministic fallback: score scales with word count, capped at
    /// 100 once the response reaches the completeness floor
    fn heuristic(&self, section: &TenderSection, words: usize) -> SectionValidation {
        let floor = self.scoring.complete_word_floor.max(1);
        let score = (words.min(floor) as f32 / floor as f32) * 100.0;
        let status = if words >= floor {
            SectionStatus::Complete
        } else {
            SectionStatus::NeedsImprovement
        };

        let gaps = if status == SectionStatus::Complete {
            Vec::new()
        } else {
            vec![format!(
                "Automated review of \"{}\" was unavailable; the response may not cover all requirements",
                section.title
            )]
        };

        SectionValidation {
            section_id: section.id.clone(),
            title: section.title.clone(),
            mandatory: section.mandatory,
            status,
            score,
            gaps,
            suggestions: Vec::new(),
        }
    }

    /// Weighted aggregation: mandatory sections weigh 1.0, optional ones
    /// `optional_weight`; the result is normalized against the maximum
    /// possible weighted score. A proposal is valid only when the
    /// normalized score clears the threshold and no mandatory section is
    /// missing.
    fn aggregate(&self, sections: Vec<SectionValidation>) -> ProposalValidation {
        let mut weighted = 0.0f32;
        let mut max_weighted = 0.0f32;

        for section in &sections {
            let weight = if section.mandatory {
                1.0
            } else {
                self.scoring.optional_weight
            };
            weighted += weight * section.score;
            max_weighted += weight * 100.0;
        }

        let score = if max_weighted > 0.0 {
            weighted / max_weighted * 100.0
        } else {
            0.0
        };

        let mandatory_missing = sections
            .iter()
            .any(|s| s.mandatory && s.status == SectionStatus::Missing);

        // Most-affected sections first
        let mut by_impact: Vec<&SectionValidation> = sections.iter().collect();
        by_impact.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        let unaddressed_requirements: Vec<String> = by_impact
            .iter()
            .flat_map(|s| s.gaps.iter().cloned())
            .take(MAX_UNADDRESSED)
            .collect();

        ProposalValidation {
            is_valid: score >= self.scoring.validity_threshold && !mandatory_missing,
            score,
            sections,
            unaddressed_requirements,
        }
    }
}

/// Extract the JSON object from a raw model reply, tolerating code fences
/// and surrounding prose
fn parse_judgment(raw: &str) -> Result<ModelJudgment, EngineError> {
    let start = raw.find('{');
    let end = raw.rfind('}');

    let json = match (start, end) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => {
            return Err(EngineError::Unparseable(format!(
                "no JSON object in model reply: {}",
                truncate_words(raw, 20)
            )))
        }
    };

    serde_json::from_str(json).map_err(|e| EngineError::Unparseable(e.to_string()))
}

fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        text.trim().to_string()
    } else {
        format!("{}...", words[..max_words].join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockCompletion;

    fn section(id: &str, title: &str, mandatory: bool) -> TenderSection {
        TenderSection {
            id: id.to_string(),
            key: id.to_string(),
            title: title.to_string(),
            requirement: "Provide full details of your approach and qualifications.".to_string(),
            mandatory,
            position: 0,
        }
    }

    fn validator(completion: Arc<MockCompletion>) -> ProposalValidator {
        ProposalValidator::new(completion, ScoringConfig::default())
    }

    fn response_of(words: usize) -> String {
        vec!["word"; words].join(" ")
    }

    #[tokio::test]
    async fn test_empty_response_is_missing_with_zero_score() {
        let completion = Arc::new(MockCompletion::failing());
        let v = validator(completion.clone());

        let result = v.score_section(&section("s1", "Eligibility", true), "").await;

        assert_eq!(result.status, SectionStatus::Missing);
        assert_eq!(result.score, 0.0);
        assert!(!result.gaps.is_empty());
        // Length floors short-circuit before any model call
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_brief_response_is_incomplete() {
        let completion = Arc::new(MockCompletion::failing());
        let v = validator(completion.clone());

        let result = v
            .score_section(&section("s1", "Eligibility", true), &response_of(60))
            .await;

        assert_eq!(result.status, SectionStatus::Incomplete);
        assert_eq!(result.score, 30.0);
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_judgment_is_used_when_parseable() {
        let completion = Arc::new(MockCompletion::returning(
            r#"{"score": 85, "status": "complete", "gaps": [], "suggestions": ["Add timelines"]}"#,
        ));
        let v = validator(completion.clone());

        let result = v
            .score_section(&section("s1", "Technical", true), &response_of(150))
            .await;

        assert_eq!(result.status, SectionStatus::Complete);
        assert_eq!(result.score, 85.0);
        assert_eq!(result.suggestions, vec!["Add timelines".to_string()]);
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_judgment_falls_back_to_heuristic() {
        let completion = Arc::new(MockCompletion::returning("Looks good to me!"));
        let v = validator(completion);

        let result = v
            .score_section(&section("s1", "Technical", true), &response_of(150))
            .await;

        // 150 of 200 words
        assert_eq!(result.status, SectionStatus::NeedsImprovement);
        assert_eq!(result.score, 75.0);
    }

    #[tokio::test]
    async fn test_upstream_failure_falls_back_to_heuristic() {
        let completion = Arc::new(MockCompletion::failing());
        let v = validator(completion);

        let result = v
            .score_section(&section("s1", "Technical", true), &response_of(250))
            .await;

        assert_eq!(result.status, SectionStatus::Complete);
        assert_eq!(result.score, 100.0);
        assert!(result.gaps.is_empty());
    }

    #[tokio::test]
    async fn test_heuristic_score_is_monotonic_in_length() {
        let v = validator(Arc::new(MockCompletion::returning("not json")));

        let mut previous = -1.0f32;
        for words in [100, 120, 150, 180, 200, 400] {
            let result = v
                .score_section(&section("s1", "Technical", true), &response_of(words))
                .await;
            assert!(
                result.score >= previous,
                "score must not decrease with more content: {} < {}",
                result.score,
                previous
            );
            previous = result.score;
        }
    }

    #[test]
    fn test_parse_judgment_tolerates_fences_and_prose() {
        let raw = "Here is my assessment:\n```json\n{\"score\": 62, \"status\": \"needs_improvement\", \"gaps\": [\"no pricing\"], \"suggestions\": []}\n```";
        let judgment = parse_judgment(raw).unwrap();
        assert_eq!(judgment.score, 62.0);
        assert_eq!(judgment.gaps, vec!["no pricing".to_string()]);
    }

    #[test]
    fn test_parse_judgment_rejects_prose_only() {
        assert!(matches!(
            parse_judgment("The response seems adequate."),
            Err(EngineError::Unparseable(_))
        ));
    }

    #[test]
    fn test_aggregate_weights_and_threshold() {
        let v = validator(Arc::new(MockCompletion::failing()));

        let sections = vec![
            SectionValidation {
                section_id: "s1".to_string(),
                title: "Technical".to_string(),
                mandatory: true,
                status: SectionStatus::Complete,
                score: 80.0,
                gaps: vec![],
                suggestions: vec![],
            },
            SectionValidation {
                section_id: "s2".to_string(),
                title: "Annexes".to_string(),
                mandatory: false,
                status: SectionStatus::NeedsImprovement,
                score: 40.0,
                gaps: vec!["missing annex A".to_string()],
                suggestions: vec![],
            },
        ];

        let result = v.aggregate(sections);

        // (1.0 * 80 + 0.5 * 40) / (1.0 + 0.5) / 100 * 100 = 66.67
        assert!((result.score - 66.666_67).abs() < 0.01);
        assert!(!result.is_valid);
        assert_eq!(result.unaddressed_requirements, vec!["missing annex A"]);
    }

    #[test]
    fn test_aggregate_mandatory_missing_blocks_validity() {
        let v = validator(Arc::new(MockCompletion::failing()));

        let sections = vec![
            SectionValidation {
                section_id: "s1".to_string(),
                title: "Technical".to_string(),
                mandatory: true,
                status: SectionStatus::Missing,
                score: 0.0,
                gaps: vec!["no response".to_string()],
                suggestions: vec![],
            },
            SectionValidation {
                section_id: "s2".to_string(),
                title: "Financial".to_string(),
                mandatory: true,
                status: SectionStatus::Complete,
                score: 100.0,
                gaps: vec![],
                suggestions: vec![],
            },
            SectionValidation {
                section_id: "s3".to_string(),
                title: "Terms".to_string(),
                mandatory: true,
                status: SectionStatus::Complete,
                score: 100.0,
                gaps: vec![],
                suggestions: vec![],
            },
        ];

        let result = v.aggregate(sections);

        // Normalized score 66.67 is below threshold anyway, but even a
        // high aggregate cannot be valid with a mandatory section missing
        assert!(!result.is_valid);
        assert_eq!(result.unaddressed_requirements[0], "no response");
    }

    #[test]
    fn test_aggregate_full_compliance_is_valid() {
        let v = validator(Arc::new(MockCompletion::failing()));

        let sections = vec![
            SectionValidation {
                section_id: "s1".to_string(),
                title: "Technical".to_string(),
                mandatory: true,
                status: SectionStatus::Complete,
                score: 90.0,
                gaps: vec![],
                suggestions: vec![],
            },
            SectionValidation {
                section_id: "s2".to_string(),
                title: "Financial".to_string(),
                mandatory: true,
                status: SectionStatus::Complete,
                score: 75.0,
                gaps: vec![],
                suggestions: vec![],
            },
        ];

        let result = v.aggregate(sections);

        assert!((result.score - 82.5).abs() < 0.01);
        assert!(result.is_valid);
        assert!(result.unaddressed_requirements.is_empty());
    }
}
