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

/// Canonical tender section categories. Derived from a section's title
/// on every use, never stored as ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionType {
    Eligibility,
    Technical,
    Financial,
    Evaluation,
    Terms,
    General,
}

/// Ordered keyword table; first match wins. Eligibility is checked before
/// Evaluation so that "Eligibility Criteria" never falls through on the
/// shared "criteria" stem.
const KEYWORD_TABLE: &[(SectionType, &[&str])] = &[
    (
        SectionType::Eligibility,
        &[
            "eligib",
            "qualification",
            "pre-qualification",
            "prequalification",
            "turnover",
            "experience requirement",
        ],
    ),
    (
        SectionType::Technical,
        &[
            "technical",
            "specification",
            "methodology",
            "scope of work",
            "approach",
            "implementation",
            "delivery plan",
        ],
    ),
    (
        SectionType::Financial,
        &[
            "financial",
            "price",
            "pricing",
            "cost",
            "budget",
            "commercial",
            "payment",
        ],
    ),
    (
        SectionType::Evaluation,
        &["evaluation", "scoring", "selection", "award criteria"],
    ),
    (
        SectionType::Terms,
        &[
            "terms",
            "conditions",
            "contract",
            "legal",
            "compliance",
            "penalt",
        ],
    ),
];

impl SectionType {
    /// Keyword-driven classification over a section title or key.
    /// Deterministic: the same input always yields the same type.
    pub fn classify(title_or_key: &str) -> SectionType {
        let normalized = title_or_key.to_lowercase();

        for (section_type, keywords) in KEYWORD_TABLE {
            if keywords.iter().any(|k| normalized.contains(k)) {
                return *section_type;
            }
        }

        SectionType::General
    }

    /// Domain keywords appended to a section's own requirement text when
    /// building the retrieval query.
    pub fn query_keywords(&self) -> &'static str {
        match self {
            SectionType::Eligibility => {
                "eligibility criteria qualification requirements registration certificates turnover"
            }
            SectionType::Technical => {
                "technical specification methodology scope of work deliverables standards"
            }
            SectionType::Financial => {
                "financial bid price schedule cost breakdown payment terms taxes"
            }
            SectionType::Evaluation => {
                "evaluation criteria scoring weightage selection method award"
            }
            SectionType::Terms => {
                "terms conditions contract obligations penalties termination liability"
            }
            SectionType::General => "tender requirements submission instructions",
        }
    }

    /// Canonical subsection headings guiding the model's response
    /// structure for this type.
    pub fn outline(&self) -> &'static [&'static str] {
        match self {
            SectionType::Eligibility => &[
                "Company Profile",
                "Qualification Criteria Compliance",
                "Relevant Experience",
                "Certifications and Registrations",
            ],
            SectionType::Technical => &[
                "Understanding of Requirements",
                "Proposed Methodology",
                "Work Plan and Timeline",
                "Quality Assurance",
            ],
            SectionType::Financial => &[
                "Commercial Summary",
                "Cost Structure",
                "Payment Terms Acceptance",
            ],
            SectionType::Evaluation => &[
                "Compliance with Evaluation Criteria",
                "Differentiators",
            ],
            SectionType::Terms => &[
                "Acceptance of Terms",
                "Deviations and Clarifications",
            ],
            SectionType::General => &["Response", "Supporting Information"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Eligibility => "eligibility",
            SectionType::Technical => "technical",
            SectionType::Financial => "financial",
            SectionType::Evaluation => "evaluation",
            SectionType::Terms => "terms",
            SectionType::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<SectionType> {
        match s.trim().to_lowercase().as_str() {
            "eligibility" => Some(SectionType::Eligibility),
            "technical" => Some(SectionType::Technical),
            "financial" => Some(SectionType::Financial),
            "evaluation" => Some(SectionType::Evaluation),
            "terms" => Some(SectionType::Terms),
            "general" => Some(SectionType::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_headings() {
        assert_eq!(
            SectionType::classify("Eligibility Criteria"),
            SectionType::Eligibility
        );
        assert_eq!(
            SectionType::classify("Technical Specifications"),
            SectionType::Technical
        );
        assert_eq!(
            SectionType::classify("Financial Bid Format"),
            SectionType::Financial
        );
        assert_eq!(
            SectionType::classify("Evaluation and Scoring"),
            SectionType::Evaluation
        );
        assert_eq!(
            SectionType::classify("General Terms and Conditions"),
            SectionType::Terms
        );
    }

    #[test]
    fn test_classify_falls_back_to_general() {
        assert_eq!(SectionType::classify("Random Heading"), SectionType::General);
        assert_eq!(SectionType::classify(""), SectionType::General);
    }

    #[test]
    fn test_classify_is_deterministic() {
        for title in ["Eligibility Criteria", "Scope of Work", "Anything Else"] {
            let first = SectionType::classify(title);
            for _ in 0..10 {
                assert_eq!(SectionType::classify(title), first);
            }
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(
            SectionType::classify("ELIGIBILITY CRITERIA"),
            SectionType::Eligibility
        );
        assert_eq!(
            SectionType::classify("payment schedule"),
            SectionType::Financial
        );
    }

    #[test]
    fn test_eligibility_wins_over_shared_stems() {
        // "criteria" also appears in the evaluation vocabulary; ordering
        // must keep eligibility first
        assert_eq!(
            SectionType::classify("Qualification Criteria"),
            SectionType::Eligibility
        );
    }

    #[test]
    fn test_every_type_has_outline_and_keywords() {
        for section_type in [
            SectionType::Eligibility,
            SectionType::Technical,
            SectionType::Financial,
            SectionType::Evaluation,
            SectionType::Terms,
            SectionType::General,
        ] {
            assert!(!section_type.outline().is_empty());
            assert!(!section_type.query_keywords().is_empty());
            assert_eq!(
                SectionType::parse(section_type.as_str()),
                Some(section_type)
            );
        }
    }
}
