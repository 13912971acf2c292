//! Numeric compliance score derived from free-text report wording.
//!
//! The score is a keyword heuristic: it counts how often each category
//! phrase appears in the report and weights the counts. Phrase wording,
//! weights and the severity rule are kept stable so that scores stay
//! comparable across runs.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IssueCategory {
    pub phrase: &'static str,
    pub weight: u32,
}

impl IssueCategory {
    /// Derived from the category phrase only, never from report content.
    /// None of the fixed phrases contain "high", so this is always 2.
    pub fn severity(&self) -> u32 {
        if self.phrase.contains("high") {
            3
        } else {
            2
        }
    }
}

pub const ISSUE_CATEGORIES: [IssueCategory; 5] = [
    IssueCategory { phrase: "grammar mistakes", weight: 3 },
    IssueCategory { phrase: "passive voice", weight: 2 },
    IssueCategory { phrase: "clarity issues", weight: 3 },
    IssueCategory { phrase: "formal writing adherence", weight: 2 },
    IssueCategory { phrase: "sentence structure", weight: 2 },
];

const MAX_SEVERITY: u32 = 3;

/// Score in `[0, 100]`, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplianceScore(f64);

impl ComplianceScore {
    pub const PERFECT: ComplianceScore = ComplianceScore(100.0);

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for ComplianceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: &'static str,
    pub weight: u32,
    pub severity: u32,
    pub occurrences: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCalculator;

impl ScoreCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn max_possible(&self) -> u32 {
        ISSUE_CATEGORIES
            .iter()
            .map(|category| MAX_SEVERITY * category.weight)
            .sum()
    }

    /// Non-overlapping, case-insensitive occurrences of each category phrase.
    pub fn breakdown(&self, report: &str) -> Vec<CategoryCount> {
        let lower = report.to_lowercase();
        ISSUE_CATEGORIES
            .iter()
            .map(|category| CategoryCount {
                category: category.phrase,
                weight: category.weight,
                severity: category.severity(),
                occurrences: lower.matches(category.phrase).count(),
            })
            .collect()
    }

    pub fn score(&self, report: &str) -> ComplianceScore {
        let total_weighted: f64 = self
            .breakdown(report)
            .iter()
            .map(|count| count.occurrences as f64 * f64::from(count.severity * count.weight))
            .sum();

        let raw = 100.0 - (total_weighted / f64::from(self.max_possible())) * 100.0;
        let rounded = (raw.max(0.0) * 100.0).round() / 100.0;
        ComplianceScore(rounded)
    }
}
