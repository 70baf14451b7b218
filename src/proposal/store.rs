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
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::sync::Arc;

use arrow_array::{Int32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::{
    query::{ExecutableQuery, QueryBase},
    Connection,
};

use crate::access::PermissionLevel;
use crate::proposal::types::{
    ActivityLogEntry, Assignment, Proposal, ProposalSection, SourceDocument, TenderSection,
};

const DOCUMENTS_TABLE: &str = "documents";
const PROPOSALS_TABLE: &str = "proposals";
const PROPOSAL_SECTIONS_TABLE: &str = "proposal_sections";
const ASSIGNMENTS_TABLE: &str = "assignments";
const ACTIVITY_TABLE: &str = "activity_log";

/// LanceDB-backed storage for documents, proposals, assignments and the
/// activity log. Structured section lists are JSON-serialized into text
/// columns; timestamps are RFC 3339 text.
pub struct ProposalStore {
    db: Connection,
}

impl ProposalStore {
    fn quote_filter_string(input: &str) -> String {
        input.replace('\'', "''")
    }

    pub async fn new(db: Connection) -> Result<Self> {
        let store = Self { db };
        store.initialize_tables().await?;
        Ok(store)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let table_names = self.db.table_names().execute().await?;

        if !table_names.contains(&DOCUMENTS_TABLE.to_string()) {
            let schema = Arc::new(Schema::new(vec![
                Field::new("id", DataType::Utf8, false),
                Field::new("title", DataType::Utf8, false),
                Field::new("sector", DataType::Utf8, false),
                Field::new("issuing_authority", DataType::Utf8, false),
                Field::new("estimated_value", DataType::Utf8, false),
                Field::new("description", DataType::Utf8, false),
                Field::new("sections", DataType::Utf8, false), // JSON serialized
                Field::new("created_at", DataType::Utf8, false),
                Field::new("updated_at", DataType::Utf8, false),
            ]));
            self.db
                .create_empty_table(DOCUMENTS_TABLE, schema)
                .execute()
                .await?;
        }

        if !table_names.contains(&PROPOSALS_TABLE.to_string()) {
            let schema = Arc::new(Schema::new(vec![
                Field::new("id", DataType::Utf8, false),
                Field::new("document_id", DataType::Utf8, false),
                Field::new("owner_org_id", DataType::Utf8, false),
                Field::new("created_at", DataType::Utf8, false),
            ]));
            self.db
                .create_empty_table(PROPOSALS_TABLE, schema)
                .execute()
                .await?;
        }

        if !table_names.contains(&PROPOSAL_SECTIONS_TABLE.to_string()) {
            let schema = Arc::new(Schema::new(vec![
                Field::new("id", DataType::Utf8, false),
                Field::new("proposal_id", DataType::Utf8, false),
                Field::new("section_id", DataType::Utf8, false),
                Field::new("content", DataType::Utf8, false),
                Field::new("word_count", DataType::Int32, false),
                Field::new("updated_at", DataType::Utf8, false),
            ]));
            self.db
                .create_empty_table(PROPOSAL_SECTIONS_TABLE, schema)
                .execute()
                .await?;
        }

        if !table_names.contains(&ASSIGNMENTS_TABLE.to_string()) {
            let schema = Arc::new(Schema::new(vec![
                Field::new("id", DataType::Utf8, false),
                Field::new("proposal_id", DataType::Utf8, false),
                Field::new("section_id", DataType::Utf8, false),
                Field::new("user_id", DataType::Utf8, false),
                Field::new("level", DataType::Utf8, false),
                Field::new("created_at", DataType::Utf8, false),
            ]));
            self.db
                .create_empty_table(ASSIGNMENTS_TABLE, schema)
                .execute()
                .await?;
        }

        if !table_names.contains(&ACTIVITY_TABLE.to_string()) {
            let schema = Arc::new(Schema::new(vec![
                Field::new("id", DataType::Utf8, false),
                Field::new("proposal_id", DataType::Utf8, false),
                Field::new("section_id", DataType::Utf8, false),
                Field::new("user_id", DataType::Utf8, false),
                Field::new("action", DataType::Utf8, false),
                Field::new("word_count", DataType::Int32, false),
                Field::new("created_at", DataType::Utf8, false),
            ]));
            self.db
                .create_empty_table(ACTIVITY_TABLE, schema)
                .execute()
                .await?;
        }

        Ok(())
    }

    // --- documents ---

    pub async fn put_document(&self, document: &SourceDocument) -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("sector", DataType::Utf8, false),
            Field::new("issuing_authority", DataType::Utf8, false),
            Field::new("estimated_value", DataType::Utf8, false),
            Field::new("description", DataType::Utf8, false),
            Field::new("sections", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
            Field::new("updated_at", DataType::Utf8, false),
        ]));

        let sections_json = serde_json::to_string(&document.sections)?;

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![document.id.clone()])),
                Arc::new(StringArray::from(vec![document.title.clone()])),
                Arc::new(StringArray::from(vec![document.sector.clone()])),
                Arc::new(StringArray::from(vec![document.issuing_authority.clone()])),
                Arc::new(StringArray::from(vec![document.estimated_value.clone()])),
                Arc::new(StringArray::from(vec![document.description.clone()])),
                Arc::new(StringArray::from(vec![sections_json])),
                Arc::new(StringArray::from(vec![document.created_at.to_rfc3339()])),
                Arc::new(StringArray::from(vec![document.updated_at.to_rfc3339()])),
            ],
        )?;

        let table = self.db.open_table(DOCUMENTS_TABLE).execute().await?;
        table
            .delete(&format!(
                "id = '{}'",
                Self::quote_filter_string(&document.id)
            ))
            .await
            .ok();

        use arrow::record_batch::RecordBatchIterator;
        use std::iter::once;
        let batch_reader = RecordBatchIterator::new(once(Ok(batch)), schema);
        table.add(batch_reader).execute().await?;

        Ok(())
    }

    pub async fn get_document(&self, document_id: &str) -> Result<Option<SourceDocument>> {
        let table = self.db.open_table(DOCUMENTS_TABLE).execute().await?;
        let results = table
            .query()
            .only_if(format!(
                "id = '{}'",
                Self::quote_filter_string(document_id)
            ))
            .limit(1)
            .execute()
            .await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        if batches.is_empty() || batches[0].num_rows() == 0 {
            return Ok(None);
        }

        let batch = &batches[0];
        let sections: Vec<TenderSection> =
            serde_json::from_str(string_value(batch, "sections", 0))?;

        Ok(Some(SourceDocument {
            id: string_value(batch, "id", 0).to_string(),
            title: string_value(batch, "title", 0).to_string(),
            sector: string_value(batch, "sector", 0).to_string(),
            issuing_authority: string_value(batch, "issuing_authority", 0).to_string(),
            estimated_value: string_value(batch, "estimated_value", 0).to_string(),
            description: string_value(batch, "description", 0).to_string(),
            sections,
            created_at: parse_timestamp(string_value(batch, "created_at", 0))?,
            updated_at: parse_timestamp(string_value(batch, "updated_at", 0))?,
        }))
    }

    pub async fn list_documents(&self) -> Result<Vec<SourceDocument>> {
        let table = self.db.open_table(DOCUMENTS_TABLE).execute().await?;
        let results = table.query().execute().await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        let mut documents = Vec::new();
        for batch in batches {
            for i in 0..batch.num_rows() {
                let sections: Vec<TenderSection> =
                    serde_json::from_str(string_value(&batch, "sections", i))?;
                documents.push(SourceDocument {
                    id: string_value(&batch, "id", i).to_string(),
                    title: string_value(&batch, "title", i).to_string(),
                    sector: string_value(&batch, "sector", i).to_string(),
                    issuing_authority: string_value(&batch, "issuing_authority", i).to_string(),
                    estimated_value: string_value(&batch, "estimated_value", i).to_string(),
                    description: string_value(&batch, "description", i).to_string(),
                    sections,
                    created_at: parse_timestamp(string_value(&batch, "created_at", i))?,
                    updated_at: parse_timestamp(string_value(&batch, "updated_at", i))?,
                });
            }
        }

        documents.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(documents)
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<()> {
        let table = self.db.open_table(DOCUMENTS_TABLE).execute().await?;
        table
            .delete(&format!(
                "id = '{}'",
                Self::quote_filter_string(document_id)
            ))
            .await?;
        Ok(())
    }

    // --- proposals ---

    pub async fn put_proposal(&self, proposal: &Proposal) -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("owner_org_id", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]));

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![proposal.id.clone()])),
                Arc::new(StringArray::from(vec![proposal.document_id.clone()])),
                Arc::new(StringArray::from(vec![proposal.owner_org_id.clone()])),
                Arc::new(StringArray::from(vec![proposal.created_at.to_rfc3339()])),
            ],
        )?;

        let table = self.db.open_table(PROPOSALS_TABLE).execute().await?;
        table
            .delete(&format!(
                "id = '{}'",
                Self::quote_filter_string(&proposal.id)
            ))
            .await
            .ok();

        use arrow::record_batch::RecordBatchIterator;
        use std::iter::once;
        let batch_reader = RecordBatchIterator::new(once(Ok(batch)), schema);
        table.add(batch_reader).execute().await?;

        Ok(())
    }

    pub async fn get_proposal(&self, proposal_id: &str) -> Result<Option<Proposal>> {
        let table = self.db.open_table(PROPOSALS_TABLE).execute().await?;
        let results = table
            .query()
            .only_if(format!(
                "id = '{}'",
                Self::quote_filter_string(proposal_id)
            ))
            .limit(1)
            .execute()
            .await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        if batches.is_empty() || batches[0].num_rows() == 0 {
            return Ok(None);
        }

        let batch = &batches[0];
        Ok(Some(Proposal {
            id: string_value(batch, "id", 0).to_string(),
            document_id: string_value(batch, "document_id", 0).to_string(),
            owner_org_id: string_value(batch, "owner_org_id", 0).to_string(),
            created_at: parse_timestamp(string_value(batch, "created_at", 0))?,
        }))
    }

    // --- proposal sections ---

    /// Insert or replace the response for one (proposal, section) pair
    pub async fn upsert_proposal_section(&self, section: &ProposalSection) -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("proposal_id", DataType::Utf8, false),
            Field::new("section_id", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("word_count", DataType::Int32, false),
            Field::new("updated_at", DataType::Utf8, false),
        ]));

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![section.id.clone()])),
                Arc::new(StringArray::from(vec![section.proposal_id.clone()])),
                Arc::new(StringArray::from(vec![section.section_id.clone()])),
                Arc::new(StringArray::from(vec![section.content.clone()])),
                Arc::new(Int32Array::from(vec![section.word_count as i32])),
                Arc::new(StringArray::from(vec![section.updated_at.to_rfc3339()])),
            ],
        )?;

        let table = self.db.open_table(PROPOSAL_SECTIONS_TABLE).execute().await?;
        table
            .delete(&format!(
                "proposal_id = '{}' AND section_id = '{}'",
                Self::quote_filter_string(&section.proposal_id),
                Self::quote_filter_string(&section.section_id)
            ))
            .await
            .ok();

        use arrow::record_batch::RecordBatchIterator;
        use std::iter::once;
        let batch_reader = RecordBatchIterator::new(once(Ok(batch)), schema);
        table.add(batch_reader).execute().await?;

        Ok(())
    }

    pub async fn sections_for_proposal(&self, proposal_id: &str) -> Result<Vec<ProposalSection>> {
        let table = self.db.open_table(PROPOSAL_SECTIONS_TABLE).execute().await?;
        let results = table
            .query()
            .only_if(format!(
                "proposal_id = '{}'",
                Self::quote_filter_string(proposal_id)
            ))
            .execute()
            .await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        let mut sections = Vec::new();
        for batch in batches {
            let word_counts = batch
                .column_by_name("word_count")
                .unwrap()
                .as_any()
                .downcast_ref::<Int32Array>()
                .unwrap();
            for i in 0..batch.num_rows() {
                sections.push(ProposalSection {
                    id: string_value(&batch, "id", i).to_string(),
                    proposal_id: string_value(&batch, "proposal_id", i).to_string(),
                    section_id: string_value(&batch, "section_id", i).to_string(),
                    content: string_value(&batch, "content", i).to_string(),
                    word_count: word_counts.value(i) as usize,
                    updated_at: parse_timestamp(string_value(&batch, "updated_at", i))?,
                });
            }
        }

        Ok(sections)
    }

    // --- assignments ---

    /// Insert an assignment, replacing any existing one for the same
    /// (proposal, section, user) triple
    pub async fn put_assignment(&self, assignment: &Assignment) -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("proposal_id", DataType::Utf8, false),
            Field::new("section_id", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, false),
            Field::new("level", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]));

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![assignment.id.clone()])),
                Arc::new(StringArray::from(vec![assignment.proposal_id.clone()])),
                Arc::new(StringArray::from(vec![assignment.section_id.clone()])),
                Arc::new(StringArray::from(vec![assignment.user_id.clone()])),
                Arc::new(StringArray::from(vec![assignment.level.to_string()])),
                Arc::new(StringArray::from(vec![assignment.created_at.to_rfc3339()])),
            ],
        )?;

        let table = self.db.open_table(ASSIGNMENTS_TABLE).execute().await?;
        table
            .delete(&format!(
                "proposal_id = '{}' AND section_id = '{}' AND user_id = '{}'",
                Self::quote_filter_string(&assignment.proposal_id),
                Self::quote_filter_string(&assignment.section_id),
                Self::quote_filter_string(&assignment.user_id)
            ))
            .await
            .ok();

        use arrow::record_batch::RecordBatchIterator;
        use std::iter::once;
        let batch_reader = RecordBatchIterator::new(once(Ok(batch)), schema);
        table.add(batch_reader).execute().await?;

        Ok(())
    }

    /// Remove one assignment; returns false when no matching row existed
    pub async fn remove_assignment(
        &self,
        proposal_id: &str,
        section_id: &str,
        user_id: &str,
    ) -> Result<bool> {
        let filter = format!(
            "proposal_id = '{}' AND section_id = '{}' AND user_id = '{}'",
            Self::quote_filter_string(proposal_id),
            Self::quote_filter_string(section_id),
            Self::quote_filter_string(user_id)
        );

        let table = self.db.open_table(ASSIGNMENTS_TABLE).execute().await?;
        let existing = table.count_rows(Some(filter.clone())).await?;
        if existing == 0 {
            return Ok(false);
        }

        table.delete(&filter).await?;
        Ok(true)
    }

    /// All assignment rows one user holds on a proposal
    pub async fn assignments_for_user(
        &self,
        proposal_id: &str,
        user_id: &str,
    ) -> Result<Vec<Assignment>> {
        self.query_assignments(format!(
            "proposal_id = '{}' AND user_id = '{}'",
            Self::quote_filter_string(proposal_id),
            Self::quote_filter_string(user_id)
        ))
        .await
    }

    pub async fn assignments_for_proposal(&self, proposal_id: &str) -> Result<Vec<Assignment>> {
        self.query_assignments(format!(
            "proposal_id = '{}'",
            Self::quote_filter_string(proposal_id)
        ))
        .await
    }

    async fn query_assignments(&self, filter: String) -> Result<Vec<Assignment>> {
        let table = self.db.open_table(ASSIGNMENTS_TABLE).execute().await?;
        let results = table.query().only_if(filter).execute().await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        let mut assignments = Vec::new();
        for batch in batches {
            for i in 0..batch.num_rows() {
                assignments.push(Assignment {
                    id: string_value(&batch, "id", i).to_string(),
                    proposal_id: string_value(&batch, "proposal_id", i).to_string(),
                    section_id: string_value(&batch, "section_id", i).to_string(),
                    user_id: string_value(&batch, "user_id", i).to_string(),
                    level: PermissionLevel::from_str(string_value(&batch, "level", i))
                        .map_err(|e| anyhow::anyhow!("stored assignment row: {}", e))?,
                    created_at: parse_timestamp(string_value(&batch, "created_at", i))?,
                });
            }
        }

        Ok(assignments)
    }

    // --- activity log ---

    /// Append-only: entries are never updated or deleted
    pub async fn append_activity(&self, entry: &ActivityLogEntry) -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("proposal_id", DataType::Utf8, false),
            Field::new("section_id", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, false),
            Field::new("action", DataType::Utf8, false),
            Field::new("word_count", DataType::Int32, false),
            Field::new("created_at", DataType::Utf8, false),
        ]));

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![entry.id.clone()])),
                Arc::new(StringArray::from(vec![entry.proposal_id.clone()])),
                Arc::new(StringArray::from(vec![entry.section_id.clone()])),
                Arc::new(StringArray::from(vec![entry.user_id.clone()])),
                Arc::new(StringArray::from(vec![entry.action.clone()])),
                Arc::new(Int32Array::from(vec![entry.word_count as i32])),
                Arc::new(StringArray::from(vec![entry.created_at.to_rfc3339()])),
            ],
        )?;

        let table = self.db.open_table(ACTIVITY_TABLE).execute().await?;

        use arrow::record_batch::RecordBatchIterator;
        use std::iter::once;
        let batch_reader = RecordBatchIterator::new(once(Ok(batch)), schema);
        table.add(batch_reader).execute().await?;

        Ok(())
    }

    /// Activity entries for a proposal, newest first
    pub async fn activity_for_proposal(&self, proposal_id: &str) -> Result<Vec<ActivityLogEntry>> {
        let table = self.db.open_table(ACTIVITY_TABLE).execute().await?;
        let results = table
            .query()
            .only_if(format!(
                "proposal_id = '{}'",
                Self::quote_filter_string(proposal_id)
            ))
            .execute()
            .await?;
        let batches: Vec<RecordBatch> = results.try_collect().await?;

        let mut entries = Vec::new();
        for batch in batches {
            let word_counts = batch
                .column_by_name("word_count")
                .unwrap()
                .as_any()
                .downcast_ref::<Int32Array>()
                .unwrap();
            for i in 0..batch.num_rows() {
                entries.push(ActivityLogEntry {
                    id: string_value(&batch, "id", i).to_string(),
                    proposal_id: string_value(&batch, "proposal_id", i).to_string(),
                    section_id: string_value(&batch, "section_id", i).to_string(),
                    user_id: string_value(&batch, "user_id", i).to_string(),
                    action: string_value(&batch, "action", i).to_string(),
                    word_count: word_counts.value(i) as usize,
                    created_at: parse_timestamp(string_value(&batch, "created_at", i))?,
                });
            }
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}

fn string_value<'a>(batch: &'a RecordBatch, name: &str, row: usize) -> &'a str {
    batch
        .column_by_name(name)
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
        .value(row)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .context("Invalid timestamp")
}
