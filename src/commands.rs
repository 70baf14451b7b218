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

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use serde::Deserialize;

use crate::access::{Actor, PermissionLevel};
use crate::cli::{Commands, DocumentCommand, ProposalCommand};
use crate::config::Config;
use crate::engine::TenderEngine;
use crate::proposal::types::{SourceDocument, TenderSection};
use crate::sections::SectionType;

/// JSON input shape for `document add`; timestamps and section ids are
/// filled in on registration when omitted
#[derive(Debug, Deserialize)]
struct DocumentInput {
    id: String,
    title: String,
    #[serde(default)]
    sector: String,
    #[serde(default)]
    issuing_authority: String,
    #[serde(default)]
    estimated_value: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    sections: Vec<SectionInput>,
}

#[derive(Debug, Deserialize)]
struct SectionInput {
    #[serde(default)]
    id: String,
    key: String,
    title: String,
    requirement: String,
    #[serde(default)]
    mandatory: bool,
    #[serde(default)]
    position: i32,
}

impl DocumentInput {
    fn into_document(self) -> SourceDocument {
        let now = Utc::now();
        let sections = self
            .sections
            .into_iter()
            .map(|s| TenderSection {
                id: if s.id.is_empty() {
                    s.key.clone()
                } else {
                    s.id
                },
                key: s.key,
                title: s.title,
                requirement: s.requirement,
                mandatory: s.mandatory,
                position: s.position,
            })
            .collect();

        SourceDocument {
            id: self.id,
            title: self.title,
            sector: self.sector,
            issuing_authority: self.issuing_authority,
            estimated_value: self.estimated_value,
            description: self.description,
            sections,
            created_at: now,
            updated_at: now,
        }
    }
}

pub async fn execute(config: &Config, command: Commands) -> Result<()> {
    let engine = TenderEngine::with_defaults(config.clone()).await?;

    match command {
        Commands::Document { command } => execute_document(&engine, command).await,
        Commands::Search {
            query,
            document,
            section_type,
        } => {
            let section_type = parse_section_type(section_type.as_deref())?;
            let retrieved = engine
                .search_document(&query, &document, section_type)
                .await?;

            if retrieved.chunks.is_empty() {
                println!("No results found");
                return Ok(());
            }

            for scored in &retrieved.chunks {
                println!("{}", "━".repeat(60));
                if let Some(section_id) = &scored.chunk.section_id {
                    println!(
                        "{} {}",
                        section_id.blue().bold(),
                        format!("[{}]", scored.chunk.section_type).cyan()
                    );
                }
                println!("{}", preview(&scored.chunk.content, 200));
                let score_pct = (scored.relevance_score * 100.0) as u32;
                println!("{}", format!("{}% relevant", score_pct).green());
                println!();
            }
            Ok(())
        }
        Commands::Proposal { command } => execute_proposal(&engine, command).await,
        Commands::Draft {
            proposal,
            section,
            actor,
            org,
            instructions,
        } => {
            let actor = Actor::new(actor, org);
            let draft = engine
                .generate_section_draft(&proposal, &section, &actor, instructions.as_deref())
                .await?;

            println!("{}", format!("[{}]", draft.section_type).cyan());
            println!("{}", draft.content);
            println!();
            println!(
                "{}",
                format!("{} words", draft.word_count).bright_black()
            );
            println!("{}", draft.disclaimer.yellow());
            Ok(())
        }
        Commands::Validate {
            proposal,
            actor,
            org,
        } => {
            let actor = Actor::new(actor, org);
            let result = engine.validate_proposal(&proposal, &actor).await?;

            let verdict = if result.is_valid {
                "VALID".green().bold()
            } else {
                "NOT VALID".red().bold()
            };
            println!("{} {}", verdict, format!("({:.1}/100)", result.score).bold());
            println!();

            for section in &result.sections {
                let status = match section.status {
                    crate::proposal::types::SectionStatus::Complete => {
                        section.status.to_string().green()
                    }
                    crate::proposal::types::SectionStatus::Missing => {
                        section.status.to_string().red()
                    }
                    _ => section.status.to_string().yellow(),
                };
                let flag = if section.mandatory {
                    "mandatory"
                } else {
                    "optional"
                };
                println!(
                    "{:<40} {:>6.1}  {}  {}",
                    section.title,
                    section.score,
                    status,
                    flag.bright_black()
                );
            }

            if !result.unaddressed_requirements.is_empty() {
                println!();
                println!("{}", "Unaddressed requirements:".bold());
                for gap in &result.unaddressed_requirements {
                    println!("  - {}", gap);
                }
            }
            Ok(())
        }
        Commands::Assign {
            proposal,
            section,
            user,
            level,
            actor,
            org,
        } => {
            let level: PermissionLevel = level.parse()?;
            let actor = Actor::new(actor, org);
            let assignment = engine
                .assign_user(&proposal, &section, &user, level, &actor)
                .await?;
            println!(
                "Granted {} {} on section {}",
                assignment.user_id.bold(),
                assignment.level.to_string().cyan(),
                assignment.section_id
            );
            Ok(())
        }
        Commands::Unassign {
            proposal,
            section,
            user,
            actor,
            org,
        } => {
            let actor = Actor::new(actor, org);
            engine
                .remove_assignment(&proposal, &section, &user, &actor)
                .await?;
            println!("Removed {} from section {}", user.bold(), section);
            Ok(())
        }
        Commands::Activity {
            proposal,
            actor,
            org,
        } => {
            let actor = Actor::new(actor, org);
            let entries = engine.activity(&proposal, &actor).await?;

            if entries.is_empty() {
                println!("No activity recorded");
                return Ok(());
            }

            for entry in entries {
                println!(
                    "{}  {}  {}  {} ({} words)",
                    entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.user_id.bold(),
                    entry.action.cyan(),
                    entry.section_id,
                    entry.word_count
                );
            }
            Ok(())
        }
        Commands::Stats => {
            let stats = engine.index_stats().await?;
            println!("{}", "Chunk Index Statistics".bold());
            println!("Total Documents: {}", stats.total_documents);
            println!("Total Chunks: {}", stats.total_chunks);
            Ok(())
        }
    }
}

async fn execute_document(engine: &TenderEngine, command: DocumentCommand) -> Result<()> {
    match command {
        DocumentCommand::Add { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file))?;
            let input: DocumentInput =
                serde_json::from_str(&content).context("Failed to parse document JSON")?;
            let document = input.into_document();

            let result = engine.ingest_document(&document).await?;
            println!(
                "Indexed {} ({} chunks)",
                result.document_id.bold(),
                result.chunks_created
            );
            Ok(())
        }
        DocumentCommand::Reindex { document_id } => {
            let documents = engine.list_documents().await?;
            let document = documents
                .into_iter()
                .find(|d| d.id == document_id)
                .with_context(|| format!("Document not found: {}", document_id))?;

            let result = engine.ingest_document(&document).await?;
            if result.was_cached {
                println!("Content unchanged, index kept as-is");
            } else {
                println!(
                    "Re-indexed {} ({} chunks)",
                    result.document_id.bold(),
                    result.chunks_created
                );
            }
            Ok(())
        }
        DocumentCommand::List => {
            let documents = engine.list_documents().await?;
            if documents.is_empty() {
                println!("No documents registered");
                return Ok(());
            }
            for document in documents {
                println!(
                    "{}  {}  {}",
                    document.id.bold(),
                    document.title,
                    format!("{} sections", document.sections.len()).bright_black()
                );
            }
            Ok(())
        }
        DocumentCommand::Rm { document_id, yes } => {
            if !yes {
                anyhow::bail!("Deletion removes the document and its chunk index; re-run with --yes to confirm");
            }
            engine.delete_document(&document_id).await?;
            println!("Deleted {}", document_id.bold());
            Ok(())
        }
    }
}

async fn execute_proposal(engine: &TenderEngine, command: ProposalCommand) -> Result<()> {
    match command {
        ProposalCommand::Create { document, org } => {
            let proposal = engine.create_proposal(&document, &org).await?;
            println!(
                "Created proposal {} for document {}",
                proposal.id.bold(),
                proposal.document_id
            );
            Ok(())
        }
        ProposalCommand::Section {
            proposal,
            section,
            file,
            actor,
            org,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file))?;
            let actor = Actor::new(actor, org);
            let saved = engine
                .save_proposal_section(&proposal, &section, &content, &actor)
                .await?;
            println!(
                "Saved response for {} ({} words)",
                saved.section_id.bold(),
                saved.word_count
            );
            Ok(())
        }
    }
}

fn parse_section_type(raw: Option<&str>) -> Result<Option<SectionType>> {
    match raw {
        None => Ok(None),
        Some(raw) => SectionType::parse(raw)
            .map(Some)
            .with_context(|| format!("Unknown section type: {}", raw)),
    }
}

fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        content.to_string()
    }
}
