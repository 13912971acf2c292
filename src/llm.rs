use crate::config::{LLMConfig, LLMProvider};
use crate::error::{BackendError, ConfigurationError};
use crate::prompts::{PromptTemplate, PromptVariables};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Anything that can turn a rendered prompt into text.
///
/// Calls are idempotent from the caller's point of view and may be retried.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables<'_>,
    ) -> Result<String, BackendError>;

    /// Human readable "provider/model" used in reports.
    fn describe(&self) -> String {
        "custom".to_string()
    }
}

pub struct LLMClient {
    config: LLMConfig,
    client: Client,
    debug: bool,
}

impl LLMClient {
    pub fn new(config: LLMConfig, debug: bool) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            client,
            debug,
        })
    }

    fn api_key(&self) -> Result<&str, BackendError> {
        self.config.api_key.as_deref().ok_or_else(|| {
            ConfigurationError::MissingApiKey {
                provider: self.config.provider.to_string(),
                env_var: self.config.provider.api_key_env().unwrap_or("").to_string(),
            }
            .into()
        })
    }

    fn base_url<'a>(&'a self, default: &'a str) -> &'a str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, BackendError> {
        if self.debug {
            tracing::debug!(
                provider = %self.config.provider,
                model = %self.config.model,
                url,
                "LLM request payload: {}",
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "Failed to serialize".to_string())
            );
        }

        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response_json: serde_json::Value = response.json().await?;
        if self.debug {
            tracing::debug!(
                "LLM raw response: {}",
                serde_json::to_string_pretty(&response_json).unwrap_or_else(|_| "Failed to serialize".to_string())
            );
        }
        Ok(response_json)
    }

    /// Groq and OpenAI share the chat completions wire format.
    async fn complete_chat(&self, default_base: &str, prompt: &str) -> Result<String, BackendError> {
        let api_key = self.api_key()?;

        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature
        });

        let url = format!("{}/chat/completions", self.base_url(default_base));
        let response_json = self
            .post_json(&url, &[("Authorization", format!("Bearer {}", api_key))], payload)
            .await?;

        extract_content(&response_json["choices"][0]["message"]["content"], &self.config.provider)
    }

    async fn complete_with_anthropic(&self, prompt: &str) -> Result<String, BackendError> {
        let api_key = self.api_key()?;

        let payload = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let url = format!("{}/v1/messages", self.base_url("https://api.anthropic.com"));
        let response_json = self
            .post_json(
                &url,
                &[
                    ("x-api-key", api_key.to_string()),
                    ("anthropic-version", "2023-06-01".to_string()),
                ],
                payload,
            )
            .await?;

        extract_content(&response_json["content"][0]["text"], &self.config.provider)
    }

    async fn complete_with_ollama(&self, prompt: &str) -> Result<String, BackendError> {
        let payload = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens
            }
        });

        let url = format!("{}/api/generate", self.base_url("http://localhost:11434"));
        let response_json = self.post_json(&url, &[], payload).await?;

        extract_content(&response_json["response"], &self.config.provider)
    }
}

fn extract_content(value: &serde_json::Value, provider: &LLMProvider) -> Result<String, BackendError> {
    value
        .as_str()
        .map(|content| content.trim().to_string())
        .ok_or_else(|| {
            BackendError::MalformedResponse(format!("Invalid response format from {}", provider))
        })
}

#[async_trait]
impl ModelBackend for LLMClient {
    async fn complete(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables<'_>,
    ) -> Result<String, BackendError> {
        let prompt = template.render(variables)?;
        tracing::debug!(template = template.name, chars = prompt.len(), "sending prompt");

        match self.config.provider {
            LLMProvider::Groq => {
                self.complete_chat("https://api.groq.com/openai/v1", &prompt)
                    .await
            }
            LLMProvider::OpenAI => self.complete_chat("https://api.openai.com/v1", &prompt).await,
            LLMProvider::Anthropic => self.complete_with_anthropic(&prompt).await,
            LLMProvider::Ollama => self.complete_with_ollama(&prompt).await,
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.config.provider, self.config.model)
    }
}
