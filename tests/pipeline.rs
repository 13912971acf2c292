use async_trait::async_trait;
use compliance_checker::{
    error::BackendError,
    prompts::{PromptTemplate, PromptVariables, COMPLIANCE_REPORT, DOCUMENT_TEXT},
    AnalysisStatus, Config, DefaultExtractor, Document, DocumentFormat, ExtractionError,
    Invocation, ModelBackend, Pipeline,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Reply = dyn Fn(&str, &PromptVariables<'_>) -> Result<String, BackendError> + Send + Sync;

/// Test double that answers through a closure and counts calls per prompt.
struct StubBackend {
    analysis_calls: AtomicUsize,
    revision_calls: AtomicUsize,
    reply: Box<Reply>,
}

impl StubBackend {
    fn new(
        reply: impl Fn(&str, &PromptVariables<'_>) -> Result<String, BackendError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            analysis_calls: AtomicUsize::new(0),
            revision_calls: AtomicUsize::new(0),
            reply: Box::new(reply),
        })
    }

    fn total_calls(&self) -> usize {
        self.analysis_calls.load(Ordering::SeqCst) + self.revision_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelBackend for StubBackend {
    async fn complete(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables<'_>,
    ) -> Result<String, BackendError> {
        match template.name {
            "analysis" => self.analysis_calls.fetch_add(1, Ordering::SeqCst),
            _ => self.revision_calls.fetch_add(1, Ordering::SeqCst),
        };
        (self.reply)(template.name, variables)
    }
}

fn config(chunk: usize) -> Config {
    let mut config = Config::default();
    config.chunking.max_segment_chars = chunk;
    config
}

fn pipeline(config: &Config, backend: Arc<StubBackend>) -> Pipeline {
    Pipeline::new(config, Arc::new(DefaultExtractor::default()), backend)
}

#[tokio::test]
async fn single_passive_voice_mention_scores_88_89() {
    let backend = StubBackend::new(|_, _| Ok("Mistakes found: passive voice.".to_string()));
    let pipeline = pipeline(&config(4000), backend.clone());
    let mut invocation =
        Invocation::from_text("The cat was chased by the dog. Mistakes found: passive voice.");

    let outcome = pipeline.analyze(&mut invocation).await;

    assert_eq!(outcome.score.value(), 88.89);
    assert_eq!(outcome.status, AnalysisStatus::Complete);
    assert_eq!(backend.analysis_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_middle_chunk_is_skipped() {
    let backend = StubBackend::new(|_, vars| {
        let text = vars[DOCUMENT_TEXT];
        if text == "BBBB" {
            Err(BackendError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        } else {
            Ok(format!("report for {}", text))
        }
    });
    let pipeline = pipeline(&config(4), backend.clone());
    let mut invocation = Invocation::from_text("AAAABBBBCCCC");

    let outcome = pipeline.analyze(&mut invocation).await;

    assert_eq!(outcome.report.as_str(), "report for AAAA\n\nreport for CCCC");
    assert_eq!(outcome.status, AnalysisStatus::Partial);
    assert_eq!(outcome.segments_total, 3);
    assert_eq!(outcome.segments_succeeded, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    assert_eq!(backend.analysis_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn blank_middle_reply_leaves_no_gap() {
    let backend = StubBackend::new(|_, vars| {
        let text = vars[DOCUMENT_TEXT];
        if text == "BBBB" {
            Ok(String::new())
        } else {
            Ok(format!("r{}", text))
        }
    });
    let pipeline = pipeline(&config(4), backend);
    let mut invocation = Invocation::from_text("AAAABBBBCCCC");

    let outcome = pipeline.analyze(&mut invocation).await;

    assert_eq!(outcome.report.as_str(), "rAAAA\n\nrCCCC");
    assert_eq!(outcome.status, AnalysisStatus::Partial);
    assert_eq!(outcome.segments_succeeded, 2);
    assert_eq!(outcome.failures[0].index, 1);
}

#[tokio::test]
async fn all_blank_replies_are_unavailable() {
    let backend = StubBackend::new(|_, _| Ok("   ".to_string()));
    let pipeline = pipeline(&config(4), backend);
    let mut invocation = Invocation::from_text("AAAABBBB");

    let outcome = pipeline.analyze(&mut invocation).await;

    assert!(outcome.report.is_empty());
    assert_eq!(outcome.status, AnalysisStatus::Unavailable);
    assert_eq!(outcome.segments_succeeded, 0);
    assert_eq!(outcome.failures.len(), 2);
    assert!(outcome.summary().contains("unavailable"));
}

#[tokio::test]
async fn panicking_chunk_is_reported_as_failed() {
    let backend = StubBackend::new(|_, vars| {
        let text = vars[DOCUMENT_TEXT];
        if text == "BBBB" {
            panic!("backend crashed");
        }
        Ok(format!("r{}", text))
    });
    let mut config = config(4);
    config.analysis.concurrency = 3;
    let pipeline = pipeline(&config, backend);
    let mut invocation = Invocation::from_text("AAAABBBBCCCC");

    let outcome = pipeline.analyze(&mut invocation).await;

    assert_eq!(outcome.report.as_str(), "rAAAA\n\nrCCCC");
    assert_eq!(outcome.status, AnalysisStatus::Partial);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    assert!(matches!(
        outcome.failures[0].source,
        BackendError::Aborted(_)
    ));
}

#[tokio::test]
async fn oversized_document_stops_before_any_call() {
    let backend = StubBackend::new(|_, _| Ok("unused".to_string()));
    let mut config = config(4000);
    config.max_file_size = 1024;
    let pipeline = pipeline(&config, backend.clone());

    let document = Document::new(vec![b'x'; 2048], DocumentFormat::Pdf);
    let err = pipeline.extract(document).await.unwrap_err();

    assert!(matches!(
        err,
        ExtractionError::Oversized {
            size: 2048,
            limit: 1024
        }
    ));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn revision_uses_original_text_and_full_report() {
    let backend = StubBackend::new(|prompt, vars| match prompt {
        "analysis" => Ok(format!("clarity issues in: {}", vars[DOCUMENT_TEXT])),
        _ => Ok(format!(
            "REVISED[{}] using [{}]",
            vars[DOCUMENT_TEXT], vars[COMPLIANCE_REPORT]
        )),
    });
    let pipeline = pipeline(&config(5), backend.clone());
    let mut invocation = Invocation::from_text("first second");

    let score = pipeline.analyze(&mut invocation).await.score;
    assert!(score.value() < 100.0);

    let revised = pipeline.revise(&mut invocation).await.unwrap();
    assert_eq!(
        revised.as_str(),
        "REVISED[first second] using [clarity issues in: first\n\nclarity issues in:  seco\n\nclarity issues in: nd]"
    );
    assert_eq!(backend.revision_calls.load(Ordering::SeqCst), 1);
    // Report and score are unchanged by the revision.
    assert_eq!(invocation.score(), Some(score));
}

#[tokio::test]
async fn revision_is_allowed_for_a_perfect_score() {
    let backend = StubBackend::new(|prompt, vars| match prompt {
        "analysis" => Ok("The document follows the guidelines.".to_string()),
        _ => Ok(vars[DOCUMENT_TEXT].to_string()),
    });
    let pipeline = pipeline(&config(4000), backend);
    let mut invocation = Invocation::from_text("A clean sentence.");

    let outcome = pipeline.analyze(&mut invocation).await;
    assert_eq!(outcome.score.value(), 100.0);
    assert!(!outcome.report.suggests_revision());

    let revised = pipeline.revise(&mut invocation).await.unwrap();
    assert_eq!(revised.as_str(), "A clean sentence.");
}

#[tokio::test]
async fn failed_revision_keeps_report() {
    let backend = StubBackend::new(|prompt, _| match prompt {
        "analysis" => Ok("grammar mistakes".to_string()),
        _ => Err(BackendError::MalformedResponse("no choices".to_string())),
    });
    let pipeline = pipeline(&config(4000), backend);
    let mut invocation = Invocation::from_text("Some text.");

    pipeline.analyze(&mut invocation).await;
    let err = pipeline.revise(&mut invocation).await.unwrap_err();

    assert!(err.to_string().starts_with("revision failed"));
    assert!(invocation.revision().is_none());
    assert_eq!(
        invocation.report().map(|r| r.as_str()),
        Some("grammar mistakes")
    );
    assert_eq!(invocation.score().map(|s| s.value()), Some(83.33));
}

/// Replies after a delay that shrinks with the chunk index, so later chunks finish first.
struct ReverseDelay;

#[async_trait]
impl ModelBackend for ReverseDelay {
    async fn complete(
        &self,
        _template: &PromptTemplate,
        variables: &PromptVariables<'_>,
    ) -> Result<String, BackendError> {
        let text = variables[DOCUMENT_TEXT].to_string();
        let delay = 10 * (b'z' - text.as_bytes()[0]) as u64;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(format!("<{}>", text))
    }
}

#[tokio::test]
async fn completion_order_does_not_change_report() {
    let text = "uuvvwwxxyyzz";
    let mut sequential_config = config(2);
    sequential_config.analysis.concurrency = 1;
    let mut concurrent_config = config(2);
    concurrent_config.analysis.concurrency = 6;

    let extractor = Arc::new(DefaultExtractor::default());
    let sequential = Pipeline::new(&sequential_config, extractor.clone(), Arc::new(ReverseDelay));
    let concurrent = Pipeline::new(&concurrent_config, extractor, Arc::new(ReverseDelay));

    let mut a = Invocation::from_text(text);
    let mut b = Invocation::from_text(text);
    let first = sequential.analyze(&mut a).await.report.clone();
    let second = concurrent.analyze(&mut b).await.report.clone();

    assert_eq!(first, second);
    assert_eq!(first.as_str(), "<uu>\n\n<vv>\n\n<ww>\n\n<xx>\n\n<yy>\n\n<zz>");
}
