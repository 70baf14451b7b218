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

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tendercore")]
#[command(version, author = "Muvon Un Limited <opensource@muvon.io>")]
#[command(about = "Grounded drafting and compliance validation engine for tender proposals", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage tender documents
    Document {
        #[command(subcommand)]
        command: DocumentCommand,
    },

    /// Semantic search over an indexed tender document
    Search {
        /// Search query
        query: String,

        /// Document to search within
        #[arg(short, long)]
        document: String,

        /// Restrict to a section type (eligibility, technical, financial, evaluation, terms, general)
        #[arg(short = 't', long)]
        section_type: Option<String>,
    },

    /// Manage proposals
    Proposal {
        #[command(subcommand)]
        command: ProposalCommand,
    },

    /// Generate a grounded draft for one proposal section
    Draft {
        /// Proposal ID
        #[arg(short, long)]
        proposal: String,

        /// Tender section ID to draft for
        #[arg(short, long)]
        section: String,

        /// Acting user ID
        #[arg(short = 'u', long)]
        actor: String,

        /// Acting user's organization ID
        #[arg(short = 'o', long)]
        org: String,

        /// Extra drafting instructions
        #[arg(short, long)]
        instructions: Option<String>,
    },

    /// Validate a proposal against its tender's requirements
    Validate {
        /// Proposal ID
        #[arg(short, long)]
        proposal: String,

        /// Acting user ID
        #[arg(short = 'u', long)]
        actor: String,

        /// Acting user's organization ID
        #[arg(short = 'o', long)]
        org: String,
    },

    /// Grant a user access to one proposal section
    Assign {
        /// Proposal ID
        #[arg(short, long)]
        proposal: String,

        /// Section ID
        #[arg(short, long)]
        section: String,

        /// User being granted access
        #[arg(long)]
        user: String,

        /// Permission level: read_only, read_and_comment, edit
        #[arg(short, long)]
        level: String,

        /// Acting user ID
        #[arg(short = 'u', long)]
        actor: String,

        /// Acting user's organization ID
        #[arg(short = 'o', long)]
        org: String,
    },

    /// Remove a user's access from one proposal section
    Unassign {
        /// Proposal ID
        #[arg(short, long)]
        proposal: String,

        /// Section ID
        #[arg(short, long)]
        section: String,

        /// User whose access is removed
        #[arg(long)]
        user: String,

        /// Acting user ID
        #[arg(short = 'u', long)]
        actor: String,

        /// Acting user's organization ID
        #[arg(short = 'o', long)]
        org: String,
    },

    /// Show drafting activity for a proposal
    Activity {
        /// Proposal ID
        #[arg(short, long)]
        proposal: String,

        /// Acting user ID
        #[arg(short = 'u', long)]
        actor: String,

        /// Acting user's organization ID
        #[arg(short = 'o', long)]
        org: String,
    },

    /// Show chunk index statistics
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum DocumentCommand {
    /// Register a tender document from a JSON file and index it
    Add {
        /// Path to the document JSON file
        file: String,
    },

    /// Re-index a registered document (rebuilds the full chunk set)
    Reindex {
        /// Document ID
        document_id: String,
    },

    /// List registered documents
    List,

    /// Delete a document and its chunk index
    Rm {
        /// Document ID
        document_id: String,

        /// Confirm deletion without prompting
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProposalCommand {
    /// Create a proposal for a tender document
    Create {
        /// Tender document ID
        #[arg(short, long)]
        document: String,

        /// Owning organization ID
        #[arg(short, long)]
        org: String,
    },

    /// Save a section response from a text file
    Section {
        /// Proposal ID
        #[arg(short, long)]
        proposal: String,

        /// Tender section ID
        #[arg(short, long)]
        section: String,

        /// Path to the response text file
        #[arg(short, long)]
        file: String,

        /// Acting user ID
        #[arg(short = 'u', long)]
        actor: String,

        /// Acting user's organization ID
        #[arg(short = 'o', long)]
        org: String,
    },
}
