use clap::{Parser, Subcommand};
use compliance_checker::{
    reporter::ReportFormat, AnalysisStatus, Config, Document, Pipeline, Reporter, SessionStore,
    Sweeper,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "compliance-checker")]
#[command(about = "Check PDF, DOCX or DOC documents against English writing guidelines")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Log debug output, including LLM payloads
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a document and score its compliance
    Check {
        /// Document to analyze (.pdf, .docx or .doc)
        file: PathBuf,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory for exported reports
        #[arg(short, long, default_value = "./compliance-output")]
        output: PathBuf,

        /// Ask the model for a corrected version of the document
        #[arg(long)]
        revise: bool,

        /// Exported report format
        #[arg(long, value_enum, default_value = "all")]
        format: ReportFormat,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the config file (defaults to ~/.compliance-checker.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove stored reports older than the retention window
    Sweep {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Keep sweeping on the configured interval until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Check {
            file,
            config,
            output,
            revise,
            format,
        } => {
            let config = load_config(config)?;
            check_document(file, config, output, revise, format, cli.verbose).await?;
        }
        Commands::Config { output } => {
            generate_config(output)?;
        }
        Commands::Sweep { config, watch } => {
            let config = load_config(config)?;
            sweep(config, watch).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(&path),
        None => Config::load(),
    }
}

fn session_store(config: &Config) -> SessionStore {
    SessionStore::new(
        config.sessions.root_dir.clone(),
        Duration::from_secs(config.sessions.retention_seconds),
    )
}

async fn check_document(
    file: PathBuf,
    config: Config,
    output_path: PathBuf,
    revise: bool,
    format: ReportFormat,
    debug: bool,
) -> anyhow::Result<()> {
    println!("📄 AI English Compliance Checker");
    println!("================================");

    let start_time = Instant::now();
    let pipeline = Pipeline::from_config(&config, debug)?;

    println!("🎯 Document: {}", file.display());
    println!("🤖 Model: {}", pipeline.backend_description());

    let document = Document::from_path(&file, config.max_file_size)?;
    let mut invocation = pipeline.extract(document).await?;

    let preview: String = invocation.text().chars().take(1000).collect();
    println!("\n📜 Extracted Text Preview");
    println!("{}...", preview);

    println!(
        "\n🔍 Analyzing {} chunk(s)...",
        pipeline.segment_count(invocation.text())
    );
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handler unavailable, analysis cannot be interrupted: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let outcome = pipeline.analyze_until(&mut invocation, interrupted).await;

    println!("\n✅ Compliance Report");
    if outcome.report.is_empty() {
        println!("(no findings returned)");
    } else {
        println!("{}", outcome.report.as_str());
    }

    println!("\n📊 {}", outcome.summary());
    let suggests_revision = outcome.report.suggests_revision();
    let status = outcome.status;

    let store = session_store(&config);
    let session = store.create()?;
    let report_file = session.write_report(&outcome.report)?;
    println!("💾 Report saved to {}", report_file.display());

    if revise && status != AnalysisStatus::Cancelled {
        println!("\n✍️  Modifying document...");
        match pipeline.revise(&mut invocation).await {
            Ok(revised) => {
                let revised_file = session.write_revision(revised)?;
                println!("✅ Modified content saved to {}", revised_file.display());
            }
            Err(e) => {
                // The report and score above remain valid.
                eprintln!("⚠️  {}", e);
            }
        }
    } else if suggests_revision {
        println!("💡 Issues were found. Re-run with --revise to get a corrected version.");
    }

    let duration = start_time.elapsed();
    let reporter = Reporter::new();
    let report = reporter.generate_report(
        &invocation,
        &file,
        &pipeline.backend_description(),
        duration.as_millis(),
    )?;
    reporter.print_summary(&report);
    let exported_files = reporter.export_report(&report, &output_path, format)?;

    println!("\n✅ Completed in {:.2}s", duration.as_secs_f64());
    println!("📁 Reports exported to:");
    for file in exported_files {
        println!("   - {}", file.display());
    }

    Ok(())
}

async fn sweep(config: Config, watch: bool) -> anyhow::Result<()> {
    let store = session_store(&config);

    if !watch {
        let removed = store.sweep()?;
        println!(
            "🧹 Removed {} expired session(s) from {}",
            removed.len(),
            store.root().display()
        );
        return Ok(());
    }

    let interval = Duration::from_secs(config.sessions.sweep_interval_seconds.max(1));
    println!(
        "🧹 Sweeping {} every {}s (Ctrl-C to stop)",
        store.root().display(),
        interval.as_secs()
    );
    let sweeper = Sweeper::spawn(store, interval);
    tokio::signal::ctrl_c().await?;
    sweeper.shutdown().await;

    Ok(())
}

fn generate_config(output_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = output_path.unwrap_or_else(|| {
        Config::default_config_path().unwrap_or_else(|_| PathBuf::from("compliance-checker.toml"))
    });

    println!("📝 Generating configuration file: {}", config_path.display());

    std::fs::write(&config_path, Config::create_documented_config())?;

    println!("✅ Configuration file created successfully!");
    println!("💡 Edit the file to customize your analysis settings.");
    println!();
    println!("🔧 Key configuration areas:");
    println!("  • LLM provider settings (Groq, OpenAI, Anthropic, Ollama)");
    println!("  • Chunk size and analysis concurrency");
    println!("  • Where reports are stored and how long they are kept");
    println!("  • API keys (or use environment variables / .env)");

    Ok(())
}
