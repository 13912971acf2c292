use crate::{
    pipeline::{AnalysisStatus, Invocation},
    score::{CategoryCount, ScoreCalculator},
};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Markdown,
    All,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub categories: Vec<CategoryCount>,
    pub failed_chunks: Vec<FailedChunk>,
    pub compliance_report: String,
    pub revised_document: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub source_file: String,
    pub version: String,
    pub backend: String,
    pub analysis_duration_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub score: f64,
    pub status: AnalysisStatus,
    pub chunks_total: usize,
    pub chunks_analyzed: usize,
    pub suggests_revision: bool,
    pub headline: String,
}

#[derive(Debug, Serialize)]
pub struct FailedChunk {
    pub chunk: usize,
    pub error: String,
}

#[derive(Default)]
pub struct Reporter {
    scorer: ScoreCalculator,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate_report(
        &self,
        invocation: &Invocation,
        source_file: &Path,
        backend: &str,
        duration_ms: u128,
    ) -> Result<Report> {
        let outcome = invocation
            .outcome()
            .ok_or_else(|| anyhow!("cannot report on a document that has not been analyzed"))?;

        Ok(Report {
            metadata: ReportMetadata {
                generated_at: chrono::Utc::now().to_rfc3339(),
                source_file: source_file.display().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                backend: backend.to_string(),
                analysis_duration_ms: duration_ms,
            },
            summary: ReportSummary {
                score: outcome.score.value(),
                status: outcome.status,
                chunks_total: outcome.segments_total,
                chunks_analyzed: outcome.segments_succeeded,
                suggests_revision: outcome.report.suggests_revision(),
                headline: outcome.summary(),
            },
            categories: self.scorer.breakdown(outcome.report.as_str()),
            failed_chunks: outcome
                .failures
                .iter()
                .map(|failure| FailedChunk {
                    chunk: failure.index + 1,
                    error: failure.source.to_string(),
                })
                .collect(),
            compliance_report: outcome.report.as_str().to_string(),
            revised_document: invocation
                .revision()
                .map(|revision| revision.as_str().to_string()),
        })
    }

    pub fn print_summary(&self, report: &Report) {
        println!("\n📊 Compliance Summary");
        println!("=====================");
        println!("  {}", report.summary.headline);
        println!(
            "  Chunks analyzed: {}/{}",
            report.summary.chunks_analyzed, report.summary.chunks_total
        );

        println!("\n🔎 Issue mentions:");
        for category in &report.categories {
            println!("  {:<26} {}", category.category, category.occurrences);
        }

        if !report.failed_chunks.is_empty() {
            println!("\n⚠️  Skipped chunks:");
            for failed in &report.failed_chunks {
                println!("  Chunk {}: {}", failed.chunk, failed.error);
            }
        }
    }

    pub fn export_report(
        &self,
        report: &Report,
        output_dir: &PathBuf,
        format: ReportFormat,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir)?;
        let mut exported_files = Vec::new();

        if matches!(format, ReportFormat::Json | ReportFormat::All) {
            let json_path = output_dir.join("compliance_report.json");
            fs::write(&json_path, serde_json::to_string_pretty(report)?)?;
            exported_files.push(json_path);
        }

        if matches!(format, ReportFormat::Markdown | ReportFormat::All) {
            let md_path = output_dir.join("compliance_summary.md");
            fs::write(&md_path, self.generate_markdown_summary(report))?;
            exported_files.push(md_path);
        }

        Ok(exported_files)
    }

    fn generate_markdown_summary(&self, report: &Report) -> String {
        let mut md = format!(
            "# English Compliance Report\n\n**Document:** {}\n**Generated:** {}\n**Model:** {}\n**Analysis Duration:** {}ms\n\n",
            report.metadata.source_file,
            report.metadata.generated_at,
            report.metadata.backend,
            report.metadata.analysis_duration_ms
        );

        md.push_str("## Score\n\n");
        md.push_str(&format!("{}\n\n", report.summary.headline));

        md.push_str("## Issue Mentions\n\n");
        md.push_str("| Category | Weight | Mentions |\n|---|---|---|\n");
        for category in &report.categories {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                category.category, category.weight, category.occurrences
            ));
        }
        md.push('\n');

        if !report.failed_chunks.is_empty() {
            md.push_str("## Skipped Chunks\n\n");
            for failed in &report.failed_chunks {
                md.push_str(&format!("- Chunk {}: {}\n", failed.chunk, failed.error));
            }
            md.push('\n');
        }

        md.push_str("## Findings\n\n");
        if report.compliance_report.is_empty() {
            md.push_str("_No findings were returned._\n");
        } else {
            md.push_str(&report.compliance_report);
            md.push('\n');
        }

        if let Some(revised) = &report.revised_document {
            md.push_str("\n## Modified Document\n\n");
            md.push_str(revised);
            md.push('\n');
        }

        md
    }
}
