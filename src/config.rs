use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::{env, fmt, path::PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_file_size: u64,
    pub chunking: ChunkingConfig,
    pub llm: LLMConfig,
    pub analysis: AnalysisConfig,
    pub extraction: ExtractionConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_segment_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LLMProvider {
    Groq,
    OpenAI,
    Anthropic,
    Ollama,
}

impl LLMProvider {
    /// Environment variable holding the API key, if the provider needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LLMProvider::Groq => Some("GROQ_API_KEY"),
            LLMProvider::OpenAI => Some("OPENAI_API_KEY"),
            LLMProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LLMProvider::Ollama => None,
        }
    }
}

impl fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LLMProvider::Groq => "Groq",
            LLMProvider::OpenAI => "OpenAI",
            LLMProvider::Anthropic => "Anthropic",
            LLMProvider::Ollama => "Ollama",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of chunk analyses in flight at once. 1 keeps calls strictly sequential.
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Apache Tika server used for legacy .doc files.
    pub tika_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub root_dir: PathBuf,
    pub retention_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10MB
            chunking: ChunkingConfig {
                max_segment_chars: 4000,
            },
            llm: LLMConfig {
                provider: LLMProvider::Groq,
                api_key: None,
                base_url: None,
                model: "mixtral-8x7b-32768".to_string(),
                max_tokens: 4096,
                temperature: 0.0,
                timeout_seconds: 120,
            },
            analysis: AnalysisConfig { concurrency: 1 },
            extraction: ExtractionConfig::default(),
            sessions: SessionConfig {
                root_dir: PathBuf::from("user_files"),
                retention_seconds: 3600,
                sweep_interval_seconds: 3600,
            },
        }
    }
}

impl Config {
    /// Get the default config file path (~/.compliance-checker.toml)
    pub fn default_config_path() -> crate::Result<PathBuf> {
        let home_dir = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(PathBuf::from(home_dir).join(".compliance-checker.toml"))
    }

    /// Load config from the default location, falling back to defaults if the file doesn't exist
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::default_config_path()?;

        let config = if config_path.exists() {
            tracing::info!("Loading configuration from {}", config_path.display());
            Self::from_file(&config_path)?
        } else {
            tracing::info!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// Load config from a specific file path
    pub fn from_file(path: &PathBuf) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config.with_env_overrides())
    }

    /// Fill the API key from `.env` / the process environment when the file leaves it unset.
    pub fn with_env_overrides(mut self) -> Self {
        let _ = dotenvy::dotenv();

        if self.llm.api_key.is_none() {
            self.llm.api_key = self
                .llm
                .provider
                .api_key_env()
                .and_then(|var| env::var(var).ok())
                .filter(|key| !key.trim().is_empty());
        }
        self
    }

    /// Save config to a file
    pub fn to_file(&self, path: &PathBuf) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Hosted providers cannot be called without credentials.
    pub fn validate_backend(&self) -> Result<(), ConfigurationError> {
        if let Some(env_var) = self.llm.provider.api_key_env() {
            if self.llm.api_key.is_none() {
                return Err(ConfigurationError::MissingApiKey {
                    provider: self.llm.provider.to_string(),
                    env_var: env_var.to_string(),
                });
            }
        }
        if self.chunking.max_segment_chars == 0 {
            return Err(ConfigurationError::Invalid(
                "chunking.max_segment_chars must be greater than 0".to_string(),
            ));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid(
                "llm.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a config file with all available options documented
    pub fn create_documented_config() -> String {
        r#"# Compliance Checker Configuration File
# This file configures how compliance-checker analyzes your documents

# Maximum accepted document size (in bytes, default 10MB)
max_file_size = 10485760

[chunking]
# Documents are split into fixed-width chunks of at most this many characters
max_segment_chars = 4000

[llm]
# LLM Provider: "Groq", "OpenAI", "Anthropic" or "Ollama"
provider = "Groq"

# API key for the provider (can also be set via environment variables or a .env file)
# Groq: GROQ_API_KEY
# OpenAI: OPENAI_API_KEY
# Anthropic: ANTHROPIC_API_KEY
# api_key = "your-api-key-here"

# Base URL override (mainly for Ollama or self-hosted gateways)
# base_url = "http://localhost:11434"

# Model to use
model = "mixtral-8x7b-32768"

# Maximum tokens for LLM responses
max_tokens = 4096

# Temperature for LLM responses (0.0 = deterministic)
temperature = 0.0

# Per-call timeout in seconds
timeout_seconds = 120

[analysis]
# Chunk analyses in flight at once (1 = one after another)
concurrency = 1

[extraction]
# Apache Tika server used to read legacy .doc files
# tika_url = "http://localhost:9998"

[sessions]
# Where per-run reports and revised documents are written
root_dir = "user_files"

# Runs older than this are removed by the cleanup sweep
retention_seconds = 3600

# How often `compliance-checker sweep --watch` runs
sweep_interval_seconds = 3600
"#
        .to_string()
    }
}
