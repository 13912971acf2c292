use crate::analyzer::SegmentReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REPORT_SEPARATOR: &str = "\n\n";

/// Document-level report: the successful segment reports in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    text: String,
    included_segments: Vec<usize>,
}

impl ComplianceReport {
    /// Wraps report text produced elsewhere, e.g. a previously saved report.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            included_segments: Vec::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn included_segments(&self) -> &[usize] {
        &self.included_segments
    }

    /// True when the findings read like there is something to fix.
    pub fn suggests_revision(&self) -> bool {
        let lower = self.text.to_lowercase();
        lower.contains("mistakes found") || lower.contains("issues")
    }
}

/// Collects segment results as they complete, in any order.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    slots: BTreeMap<usize, Option<SegmentReport>>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: SegmentReport) {
        self.slots.insert(report.index, Some(report));
    }

    /// Marks a segment whose analysis failed. It leaves no trace in the report.
    pub fn record_failure(&mut self, index: usize) {
        self.slots.insert(index, None);
    }

    pub fn recorded(&self) -> usize {
        self.slots.len()
    }

    pub fn is_recorded(&self, index: usize) -> bool {
        self.slots.contains_key(&index)
    }

    pub fn succeeded(&self) -> usize {
        self.slots.values().filter(|slot| slot.is_some()).count()
    }

    pub fn build(&self) -> ComplianceReport {
        let present: Vec<&SegmentReport> = self.slots.values().flatten().collect();

        ComplianceReport {
            text: present
                .iter()
                .map(|report| report.text.as_str())
                .collect::<Vec<_>>()
                .join(REPORT_SEPARATOR),
            included_segments: present.iter().map(|report| report.index).collect(),
        }
    }
}
