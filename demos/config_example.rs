use compliance_checker::{Chunker, Config, ScoreCalculator};

fn main() -> anyhow::Result<()> {
    println!("Compliance Checker Configuration Example");
    println!("========================================");

    match Config::default_config_path() {
        Ok(path) => println!("📍 Default config location: {}", path.display()),
        Err(e) => println!("❌ Error getting config path: {}", e),
    }

    println!("\n🔧 Loading configuration...");
    let config = Config::load()?;

    println!("✅ Configuration loaded successfully!");
    println!("🤖 LLM Provider: {}", config.llm.provider);
    println!("🧠 Model: {} (temperature {})", config.llm.model, config.llm.temperature);
    println!("✂️  Chunk size: {} characters", config.chunking.max_segment_chars);
    println!("📦 Max file size: {} bytes", config.max_file_size);
    println!("🗂️  Session root: {}", config.sessions.root_dir.display());

    match config.validate_backend() {
        Ok(()) => println!("🔑 API key: [CONFIGURED]"),
        Err(e) => println!("🔑 {}", e),
    }

    let sample = "The cat was chased by the dog. Mistakes found: passive voice.";
    let chunker = Chunker::new(config.chunking.max_segment_chars);
    println!(
        "\n🧪 Sample text splits into {} chunk(s); a report mentioning \"passive voice\" once scores {}%",
        chunker.segment_count(sample),
        ScoreCalculator::new().score("Mistakes found: passive voice")
    );

    Ok(())
}
