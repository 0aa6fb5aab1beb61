use std::time::Duration;
use anyhow::{Result, anyhow, Context};
use log::{info, error, debug};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::Config;
use crate::services::ChatMessage;

/// Client for an OpenAI-compatible chat-completions endpoint
#[derive(Clone, Debug)]
pub struct OpenAIService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIService {
    /// Create a new OpenAIService using Config; `None` when no API key is set
    pub fn new(config: &Config) -> Result<Option<Self>> {
        match &config.openai_api_key {
            Some(api_key) if !api_key.trim().is_empty() => {
                let client = Client::builder()
                    .timeout(Duration::from_secs(config.llm_timeout_secs))
                    .build()
                    .context("Failed to build HTTP client")?;

                info!("🤖 OpenAIService initialized with model {}", config.openai_model);
                Ok(Some(Self {
                    client,
                    api_key: api_key.clone(),
                    model: config.openai_model.clone(),
                    base_url: config.openai_base_url.trim_end_matches('/').to_string(),
                }))
            }
            _ => {
                info!("OpenAI API key not set in config, using deterministic analysis only");
                Ok(None)
            }
        }
    }

    pub async fn chat(&self, messages: &[ChatMessage], temperature: f32, max_tokens: u32) -> Result<String> {
        let request_body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        debug!("Sending request to OpenAI API with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("OpenAI API request timed out: {}", e)
                } else if e.is_connect() {
                    anyhow!("Failed to connect to OpenAI API: {}", e)
                } else {
                    anyhow!("Failed to send request to OpenAI API: {}", e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            error!("OpenAI API error: Status {}, Details: {}", status, error_text);
            return Err(anyhow!("OpenAI API error: Status {}", status));
        }

        let response_json: Value = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        response_json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Could not extract content from OpenAI response"))
    }
}

/// Slice the JSON payload out of a model reply, dropping markdown fences
/// and any prose around the outermost object or array.
pub fn json_payload(text: &str) -> &str {
    let trimmed = text.trim();
    let start = trimmed.find(|c: char| c == '{' || c == '[');
    let end = trimmed.rfind(|c: char| c == '}' || c == ']');
    match (start, end) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
