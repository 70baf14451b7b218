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

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::EngineError;
use crate::proposal::types::{Assignment, Proposal};

/// Section-level access lattice, totally ordered by access breadth.
/// Threshold comparisons only; a higher level implies every capability
/// of the levels below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermissionLevel {
    ReadOnly,
    ReadAndComment,
    Edit,
    Owner,
}

impl PermissionLevel {
    /// Numeric rank used in diagnostics and stored rows
    pub fn rank(&self) -> u8 {
        match self {
            PermissionLevel::ReadOnly => 1,
            PermissionLevel::ReadAndComment => 2,
            PermissionLevel::Edit => 3,
            PermissionLevel::Owner => 4,
        }
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionLevel::ReadOnly => write!(f, "read_only"),
            PermissionLevel::ReadAndComment => write!(f, "read_and_comment"),
            PermissionLevel::Edit => write!(f, "edit"),
            PermissionLevel::Owner => write!(f, "owner"),
        }
    }
}

impl FromStr for PermissionLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read_only" | "readonly" | "read" => Ok(PermissionLevel::ReadOnly),
            "read_and_comment" | "comment" => Ok(PermissionLevel::ReadAndComment),
            "edit" => Ok(PermissionLevel::Edit),
            "owner" => Ok(PermissionLevel::Owner),
            other => Err(EngineError::InvalidInput(format!(
                "unknown permission level: {}",
                other
            ))),
        }
    }
}

/// Acting identity attached to every caller-facing operation
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub org_id: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: org_id.into(),
        }
    }
}

/// Operations gated by the authority, each with a declared minimum level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Comment,
    Draft,
    EditSection,
    Validate,
    ManageAssignments,
}

impl Action {
    pub fn required_level(&self) -> PermissionLevel {
        match self {
            Action::View => PermissionLevel::ReadOnly,
            Action::Comment => PermissionLevel::ReadAndComment,
            Action::Draft | Action::EditSection => PermissionLevel::Edit,
            Action::Validate | Action::ManageAssignments => PermissionLevel::Owner,
        }
    }
}

/// Resolves an actor's effective level from fetched rows and enforces
/// thresholds. Pure over its inputs; the engine fetches the assignment
/// rows and calls in before any retrieval or model work happens.
pub struct PermissionAuthority;

impl PermissionAuthority {
    /// Effective permission for an actor on a proposal, optionally scoped
    /// to one section.
    ///
    /// - The owning organization holds Owner implicitly, with no
    ///   Assignment lookup at all.
    /// - With a section id, only an explicit Assignment for that exact
    ///   (section, user) pair grants access; there is no read-only
    ///   default at section granularity.
    /// - Without a section id, any Assignment on the proposal grants
    ///   ReadOnly for whole-proposal read scope.
    pub fn resolve(
        proposal: &Proposal,
        actor: &Actor,
        section_id: Option<&str>,
        assignments: &[Assignment],
    ) -> Option<PermissionLevel> {
        if proposal.owner_org_id == actor.org_id {
            return Some(PermissionLevel::Owner);
        }

        match section_id {
            Some(section_id) => assignments
                .iter()
                .find(|a| a.user_id == actor.user_id && a.section_id == section_id)
                .map(|a| a.level),
            None => {
                if assignments.iter().any(|a| a.user_id == actor.user_id) {
                    Some(PermissionLevel::ReadOnly)
                } else {
                    None
                }
            }
        }
    }

    /// Threshold check: succeeds iff the resolved level is at least the
    /// action's required level. The error carries required vs. actual
    /// for diagnostics.
    pub fn authorize(
        proposal: &Proposal,
        actor: &Actor,
        section_id: Option<&str>,
        assignments: &[Assignment],
        action: Action,
    ) -> Result<PermissionLevel, EngineError> {
        let required = action.required_level();
        let actual = Self::resolve(proposal, actor, section_id, assignments);

        match actual {
            Some(level) if level >= required => Ok(level),
            _ => Err(EngineError::Forbidden { required, actual }),
        }
    }
}
