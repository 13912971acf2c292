use crate::extractor::DocumentFormat;
use std::time::Duration;
use thiserror::Error;

/// Failure to turn an uploaded document into plain text.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("extraction failed: file is {size} bytes, limit is {limit} bytes")]
    Oversized { size: u64, limit: u64 },

    #[error("extraction failed: could not read {format} document: {reason}")]
    Unreadable { format: DocumentFormat, reason: String },

    #[error("extraction failed: document contains no text")]
    Empty,

    #[error("extraction failed: unsupported file type '{0}' (expected pdf, doc or docx)")]
    UnsupportedFormat(String),

    #[error("extraction failed: no converter configured for {0} documents")]
    ConverterUnavailable(DocumentFormat),

    #[error("extraction failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single call to the model backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request to model backend failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response from model backend: {0}")]
    MalformedResponse(String),

    #[error("model backend did not answer within {0:?}")]
    Timeout(Duration),

    #[error("model backend task ended without a result: {0}")]
    Aborted(String),

    #[error("prompt '{template}' is missing variable '{variable}'")]
    MissingVariable { template: String, variable: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Analysis of one segment failed. Non-fatal: the segment is skipped.
#[derive(Error, Debug)]
#[error("analysis of chunk {} failed: {source}", .index + 1)]
pub struct AnalysisError {
    pub index: usize,
    #[source]
    pub source: BackendError,
}

/// Revision of the whole document failed. The report and score stay valid.
#[derive(Error, Debug)]
#[error("revision failed: {source}")]
pub struct RevisionError {
    #[source]
    pub source: BackendError,
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("configuration error: no API key for {provider} (set {env_var} or llm.api_key)")]
    MissingApiKey { provider: String, env_var: String },

    #[error("configuration error: {0}")]
    Invalid(String),
}

/// Errors that stop a pipeline invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Revision(#[from] RevisionError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("revision failed: the document has not been analyzed yet")]
    NotAnalyzed,
}
