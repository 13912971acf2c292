pub mod aggregator;
pub mod analyzer;
pub mod chunker;
pub mod config;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod reporter;
pub mod reviser;
pub mod score;
pub mod session;

pub use aggregator::{ComplianceReport, ReportAggregator};
pub use analyzer::{ComplianceAnalyzer, SegmentReport};
pub use chunker::{Chunker, Segment};
pub use config::Config;
pub use error::{AnalysisError, ConfigurationError, ExtractionError, PipelineError, RevisionError};
pub use extractor::{DefaultExtractor, Document, DocumentFormat, TextExtractor};
pub use llm::{LLMClient, ModelBackend};
pub use pipeline::{AnalysisOutcome, AnalysisStatus, Invocation, Pipeline};
pub use reporter::Reporter;
pub use reviser::{ContentReviser, RevisedText};
pub use score::{ComplianceScore, ScoreCalculator};
pub use session::{SessionStore, Sweeper};

pub type Result<T> = anyhow::Result<T>;
