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

use crate::config::ModelConfig;
use crate::error::EngineError;
use crate::llm::CompletionProvider;
use crate::proposal::types::{SourceDocument, TenderSection};
use crate::retrieval::Retriever;
use crate::sections::SectionType;

const DISCLAIMER: &str = "Generated from tender context. Review bracketed placeholders and verify all statements before submission.";

/// A grounded section draft
#[derive(Debug, Clone)]
pub struct SectionDraft {
    pub content: String,
    pub word_count: usize,
    pub section_type: SectionType,
    pub disclaimer: String,
}

/// Assembles a fact-constrained prompt from tender context and retrieved
/// chunks, invokes the external model, and sanitizes the result. Holds no
/// store handles beyond the retriever; the activity log entry for a
/// successful draft is written by the engine.
pub struct GroundedDrafter {
    retriever: Retriever,
    completion_provider: Arc<dyn CompletionProvider>,
    model: ModelConfig,
}

impl GroundedDrafter {
    pub fn new(
        retriever: Retriever,
        completion_provider: Arc<dyn CompletionProvider>,
        model: ModelConfig,
    ) -> Self {
        Self {
            retriever,
            completion_provider,
            model,
        }
    }

    pub async fn draft(
        &self,
        document: &SourceDocument,
        section: &TenderSection,
        custom_instructions: Option<&str>,
    ) -> Result<SectionDraft, EngineError> {
        let section_type = SectionType::classify(&section.title);

        let query = format!("{} {}", section.requirement, section_type.query_keywords());
        let mut retrieved = self
            .retriever
            .retrieve(&query, &document.id, Some(section_type))
            .await?;

        // A section-type filter can miss when the tender's headings don't
        // line up with ours; widen to the whole document before giving up
        // on context.
        if retrieved.is_empty() {
            retrieved = self.retriever.retrieve(&query, &document.id, None).await?;
        }

        let system_prompt = build_system_prompt(document);
        let user_prompt = build_user_prompt(section, section_type, &retrieved.context, custom_instructions);

        debug!(
            section_id = %section.id,
            section_type = %section_type,
            context_chunks = retrieved.chunks.len(),
            "requesting draft"
        );

        let raw = self
            .completion_provider
            .complete(
                &system_prompt,
                &user_prompt,
                self.model.temperature,
                self.model.max_tokens,
            )
            .await?;

        let content = sanitize_model_output(&raw);
        if content.trim().is_empty() {
            return Err(EngineError::Unparseable(
                "model returned an empty draft".into(),
            ));
        }

        Ok(SectionDraft {
            word_count: content.split_whitespace().count(),
            content,
            section_type,
            disclaimer: DISCLAIMER.to_string(),
        })
    }
}

fn build_system_prompt(document: &SourceDocument) -> String {
    format!(
        "You are a proposal writer preparing a bid response for the tender \"{}\".\n\
         Tender context: sector: {}; issuing authority: {}; estimated value: {}.\n\
         Rules:\n\
         - Use only facts present in the supplied tender context.\n\
         - Never invent concrete facts, names, figures, or certifications.\n\
         - Where bidder-specific data is required, insert a bracketed placeholder such as [COMPANY NAME] or [ANNUAL TURNOVER].\n\
         - Follow the requested outline for structure.\n\
         - Use formal, precise language appropriate for a bid submission.",
        document.title, document.sector, document.issuing_authority, document.estimated_value
    )
}

fn build_user_prompt(
    section: &TenderSection,
    section_type: SectionType,
    context: &str,
    custom_instructions: Option<&str>,
) -> String {
    let outline = section_type
        .outline()
        .iter()
        .map(|h| format!("- {}", h))
        .collect::<Vec<_>>()
        .join("\n");

    let context_block = if context.trim().is_empty() {
        "No additional context available."
    } else {
        context
    };

    let mut prompt = format!(
        "Section: {}\n\nRequirement:\n{}\n\nTender context:\n{}\n\nStructure the response under these headings:\n{}",
        section.title, section.requirement, context_block, outline
    );

    if let Some(instructions) = custom_instructions {
        if !instructions.trim().is_empty() {
            prompt.push_str("\n\nAdditional instructions: ");
            prompt.push_str(instructions.trim());
        }
    }

    prompt
}

/// Strip code fences, markdown headers and bold/emphasis markers, and
/// collapse runs of blank lines. Keeps plain bullet lists intact.
pub(crate) fn sanitize_model_output(raw: &str) -> String {
    let mut lines = Vec::new();
    let mut previous_blank = false;

    for line in raw.lines() {
        let trimmed = line.trim_end();

        // Drop fence lines entirely
        if trimmed.trim_start().starts_with("```") {
            continue;
        }

        // Strip leading header markers
        let without_header = {
            let stripped = trimmed.trim_start_matches('#');
            if stripped.len() != trimmed.len() {
                stripped.trim_start()
            } else {
                trimmed
            }
        };

        let cleaned = without_header.replace("**", "").replace("__", "");

        let is_blank = cleaned.trim().is_empty();
        if is_blank && previous_blank {
            continue;
        }
        previous_blank = is_blank;
        lines.push(cleaned);
    }

    // Trim leading/trailing blank lines
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::types::TenderSection;

    fn section() -> TenderSection {
        TenderSection {
            id: "sec-1".to_string(),
            key: "technical".to_string(),
            title: "Technical Approach".to_string(),
            requirement: "Describe your methodology.".to_string(),
            mandatory: true,
            position: 1,
        }
    }

    #[test]
    fn test_sanitize_strips_code_fences() {
        let raw = "```markdown\nSome draft text\n```";
        assert_eq!(sanitize_model_output(raw), "Some draft text");
    }

    #[test]
    fn test_sanitize_strips_headers_and_bold() {
        let raw = "## Understanding of Requirements\n\nWe propose **a phased rollout**.";
        assert_eq!(
            sanitize_model_output(raw),
            "Understanding of Requirements\n\nWe propose a phased rollout."
        );
    }

    #[test]
    fn test_sanitize_collapses_blank_runs() {
        let raw = "First paragraph.\n\n\n\nSecond paragraph.";
        assert_eq!(
            sanitize_model_output(raw),
            "First paragraph.\n\nSecond paragraph."
        );
    }

    #[test]
    fn test_sanitize_keeps_bullet_lists() {
        let raw = "* first point\n* second point";
        assert_eq!(sanitize_model_output(raw), "* first point\n* second point");
    }

    #[test]
    fn test_user_prompt_degrades_without_context() {
        let prompt = build_user_prompt(&section(), SectionType::Technical, "", None);
        assert!(prompt.contains("No additional context available."));
        assert!(prompt.contains("Proposed Methodology"));
    }

    #[test]
    fn test_user_prompt_includes_custom_instructions() {
        let prompt = build_user_prompt(
            &section(),
            SectionType::Technical,
            "context text",
            Some("Emphasize cloud experience"),
        );
        assert!(prompt.contains("Additional instructions: Emphasize cloud experience"));
        assert!(prompt.contains("context text"));
    }
}
