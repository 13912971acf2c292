use crate::aggregator::{ComplianceReport, ReportAggregator};
use crate::analyzer::ComplianceAnalyzer;
use crate::chunker::Chunker;
use crate::config::Config;
use crate::error::{AnalysisError, BackendError, ExtractionError, PipelineError};
use crate::extractor::{DefaultExtractor, Document, TextExtractor};
use crate::llm::{LLMClient, ModelBackend};
use crate::reviser::{ContentReviser, RevisedText};
use crate::score::{ComplianceScore, ScoreCalculator};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Every segment produced a report.
    Complete,
    /// Some segments failed; the report covers the rest.
    Partial,
    /// No segment produced a report. The score is not meaningful.
    Unavailable,
    /// Stopped before every segment was analyzed.
    Cancelled,
}

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub report: ComplianceReport,
    pub score: ComplianceScore,
    pub status: AnalysisStatus,
    pub segments_total: usize,
    pub segments_succeeded: usize,
    pub failures: Vec<AnalysisError>,
}

impl AnalysisOutcome {
    /// One-line summary that never presents missing data as a clean document.
    pub fn summary(&self) -> String {
        match self.status {
            AnalysisStatus::Complete => format!("Overall Compliance Score: {}%", self.score),
            AnalysisStatus::Partial => format!(
                "Overall Compliance Score: {}% (based on {} of {} chunks)",
                self.score, self.segments_succeeded, self.segments_total
            ),
            AnalysisStatus::Unavailable => {
                "Compliance analysis unavailable: every chunk failed".to_string()
            }
            AnalysisStatus::Cancelled => format!(
                "Analysis cancelled after {} of {} chunks; partial score {}%",
                self.segments_succeeded, self.segments_total, self.score
            ),
        }
    }
}

/// State owned by one run of the pipeline over one document.
#[derive(Debug)]
pub struct Invocation {
    text: String,
    outcome: Option<AnalysisOutcome>,
    revision: Option<RevisedText>,
}

impl Invocation {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            outcome: None,
            revision: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    pub fn report(&self) -> Option<&ComplianceReport> {
        self.outcome.as_ref().map(|outcome| &outcome.report)
    }

    pub fn score(&self) -> Option<ComplianceScore> {
        self.outcome.as_ref().map(|outcome| outcome.score)
    }

    pub fn revision(&self) -> Option<&RevisedText> {
        self.revision.as_ref()
    }
}

pub struct Pipeline {
    extractor: Arc<dyn TextExtractor>,
    backend: Arc<dyn ModelBackend>,
    chunker: Chunker,
    scorer: ScoreCalculator,
    max_file_size: u64,
    concurrency: usize,
    call_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        extractor: Arc<dyn TextExtractor>,
        backend: Arc<dyn ModelBackend>,
    ) -> Self {
        Self {
            extractor,
            backend,
            chunker: Chunker::new(config.chunking.max_segment_chars.max(1)),
            scorer: ScoreCalculator::new(),
            max_file_size: config.max_file_size,
            concurrency: config.analysis.concurrency.max(1),
            call_timeout: Duration::from_secs(config.llm.timeout_seconds.max(1)),
        }
    }

    /// Wires the default extractor and the HTTP client for the configured provider.
    pub fn from_config(config: &Config, debug: bool) -> Result<Self, PipelineError> {
        config.validate_backend()?;
        let backend = LLMClient::new(config.llm.clone(), debug).map_err(|e| {
            crate::error::ConfigurationError::Invalid(format!("could not build HTTP client: {}", e))
        })?;
        let extractor = DefaultExtractor::new(config.extraction.tika_url.clone());

        Ok(Self::new(config, Arc::new(extractor), Arc::new(backend)))
    }

    pub fn backend_description(&self) -> String {
        self.backend.describe()
    }

    pub fn segment_count(&self, text: &str) -> usize {
        self.chunker.segment_count(text)
    }

    pub async fn extract(&self, document: Document) -> Result<Invocation, ExtractionError> {
        let extractor = Arc::clone(&self.extractor);
        let max_size = self.max_file_size;
        let format = document.format();

        tracing::info!(%format, bytes = document.len(), "Extracting text...");
        let text = tokio::task::spawn_blocking(move || extractor.extract(&document, max_size))
            .await
            .map_err(|e| ExtractionError::Io(std::io::Error::other(e)))??;

        Ok(Invocation::from_text(text))
    }

    pub async fn analyze<'i>(&self, invocation: &'i mut Invocation) -> &'i AnalysisOutcome {
        self.analyze_until(invocation, std::future::pending()).await
    }

    /// Analyzes every segment unless `cancel` completes first. On cancellation
    /// in-flight calls are abandoned and the outcome holds whatever finished.
    pub async fn analyze_until<'i, C>(
        &self,
        invocation: &'i mut Invocation,
        cancel: C,
    ) -> &'i AnalysisOutcome
    where
        C: Future<Output = ()>,
    {
        let segments: Vec<(usize, String)> = self
            .chunker
            .segments(&invocation.text)
            .map(|segment| (segment.index, segment.text.to_string()))
            .collect();
        let total = segments.len();
        tracing::info!(
            chunks = total,
            concurrency = self.concurrency,
            "Analyzing document..."
        );

        let analyzer = ComplianceAnalyzer::new(Arc::clone(&self.backend), self.call_timeout);
        let mut aggregator = ReportAggregator::new();
        let mut failures = Vec::new();
        let mut pending = segments.into_iter();
        let mut in_flight = JoinSet::new();
        let mut cancelled = false;
        let mut lost_tasks = Vec::new();
        tokio::pin!(cancel);

        loop {
            while in_flight.len() < self.concurrency {
                let Some((index, text)) = pending.next() else {
                    break;
                };
                tracing::info!("Processing chunk {} of {}...", index + 1, total);
                let analyzer = analyzer.clone();
                in_flight.spawn(async move { analyzer.analyze_text(index, &text).await });
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = &mut cancel => {
                    in_flight.abort_all();
                    cancelled = true;
                    tracing::warn!(
                        completed = aggregator.recorded(),
                        total,
                        "analysis cancelled, keeping completed chunks"
                    );
                    break;
                }
                joined = in_flight.join_next() => match joined {
                    Some(Ok(Ok(report))) => aggregator.record(report),
                    Some(Ok(Err(err))) => {
                        tracing::warn!("{}; skipping chunk", err);
                        aggregator.record_failure(err.index);
                        failures.push(err);
                    }
                    Some(Err(join_error)) => {
                        // Attributed to its chunk once every task has been joined.
                        tracing::error!("chunk analysis task failed: {}", join_error);
                        lost_tasks.push(join_error.to_string());
                    }
                    None => break,
                },
            }
        }

        if !cancelled && !lost_tasks.is_empty() {
            let reason = lost_tasks.join("; ");
            for index in 0..total {
                if !aggregator.is_recorded(index) {
                    aggregator.record_failure(index);
                    failures.push(AnalysisError {
                        index,
                        source: BackendError::Aborted(reason.clone()),
                    });
                }
            }
        }
        failures.sort_by_key(|failure| failure.index);

        let report = aggregator.build();
        let score = self.scorer.score(report.as_str());
        let succeeded = aggregator.succeeded();
        let status = if cancelled {
            AnalysisStatus::Cancelled
        } else if succeeded == total {
            AnalysisStatus::Complete
        } else if succeeded == 0 {
            AnalysisStatus::Unavailable
        } else {
            AnalysisStatus::Partial
        };

        tracing::info!(
            succeeded,
            total,
            status = ?status,
            score = score.value(),
            "analysis finished"
        );

        invocation.revision = None;
        invocation.outcome.insert(AnalysisOutcome {
            report,
            score,
            status,
            segments_total: total,
            segments_succeeded: succeeded,
            failures,
        })
    }

    /// Permitted for any score, including 100. A failure leaves the report
    /// and score of the invocation untouched.
    pub async fn revise<'i>(
        &self,
        invocation: &'i mut Invocation,
    ) -> Result<&'i RevisedText, PipelineError> {
        let report = invocation.report().ok_or(PipelineError::NotAnalyzed)?;

        tracing::info!("Modifying document...");
        let reviser = ContentReviser::new(Arc::clone(&self.backend), self.call_timeout);
        let revised = reviser.revise(&invocation.text, report).await?;

        Ok(invocation.revision.insert(revised))
    }
}
