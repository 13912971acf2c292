use crate::chunker::Segment;
use crate::error::{AnalysisError, BackendError};
use crate::llm::ModelBackend;
use crate::prompts::{PromptVariables, ANALYSIS, DOCUMENT_TEXT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Free-text findings for one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub index: usize,
    pub text: String,
}

/// Sends one segment at a time to the backend with the analysis prompt.
/// Performs no retry; the caller decides what to do with a failure.
#[derive(Clone)]
pub struct ComplianceAnalyzer {
    backend: Arc<dyn ModelBackend>,
    timeout: Duration,
}

impl ComplianceAnalyzer {
    pub fn new(backend: Arc<dyn ModelBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn analyze_segment(&self, segment: &Segment<'_>) -> Result<SegmentReport, AnalysisError> {
        self.analyze_text(segment.index, segment.text).await
    }

    pub async fn analyze_text(&self, index: usize, text: &str) -> Result<SegmentReport, AnalysisError> {
        let variables = PromptVariables::from([(DOCUMENT_TEXT, text)]);

        let response = tokio::time::timeout(self.timeout, self.backend.complete(&ANALYSIS, &variables))
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))
            .and_then(|result| result)
            .map_err(|source| AnalysisError { index, source })?;

        // A blank reply carries no findings and must not count as an analyzed chunk.
        if response.trim().is_empty() {
            return Err(AnalysisError {
                index,
                source: BackendError::MalformedResponse("empty compliance report".to_string()),
            });
        }

        Ok(SegmentReport {
            index,
            text: response,
        })
    }
}
