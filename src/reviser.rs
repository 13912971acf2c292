use crate::aggregator::ComplianceReport;
use crate::error::{BackendError, RevisionError};
use crate::llm::ModelBackend;
use crate::prompts::{PromptVariables, COMPLIANCE_REPORT, DOCUMENT_TEXT, REVISION};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisedText(String);

impl RevisedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Rewrites the whole document in one backend call. All or nothing: there
/// is no partial result and no retry.
pub struct ContentReviser {
    backend: Arc<dyn ModelBackend>,
    timeout: Duration,
}

impl ContentReviser {
    pub fn new(backend: Arc<dyn ModelBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn revise(
        &self,
        original: &str,
        report: &ComplianceReport,
    ) -> Result<RevisedText, RevisionError> {
        let variables = PromptVariables::from([
            (DOCUMENT_TEXT, original),
            (COMPLIANCE_REPORT, report.as_str()),
        ]);

        let text = tokio::time::timeout(self.timeout, self.backend.complete(&REVISION, &variables))
            .await
            .map_err(|_| BackendError::Timeout(self.timeout))
            .and_then(|result| result)
            .map_err(|source| RevisionError { source })?;

        if text.trim().is_empty() {
            return Err(RevisionError {
                source: BackendError::MalformedResponse("empty revised document".to_string()),
            });
        }

        Ok(RevisedText::new(text))
    }
}
