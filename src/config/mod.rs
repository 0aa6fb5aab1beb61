use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;

const DEFAULT_ORIGINS: &str =
    "http://localhost:3000,http://127.0.0.1:3000,http://localhost:5173,http://127.0.0.1:5173";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub redis_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub llm_timeout_secs: u64,
    pub schema_cache_ttl_secs: u64,
    pub answer_cache_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            redis_url: None,
            openai_api_key: None,
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            llm_timeout_secs: 30,
            schema_cache_ttl_secs: 3600,
            answer_cache_ttl_secs: 1800,
            max_upload_bytes: 50 * 1024 * 1024,
            allowed_origins: split_origins(DEFAULT_ORIGINS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
            redis_url: non_blank_var("REDIS_URL"),
            openai_api_key: non_blank_var("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            llm_timeout_secs: parse_var("LLM_TIMEOUT_SECS", defaults.llm_timeout_secs)?,
            schema_cache_ttl_secs: parse_var("SCHEMA_CACHE_TTL_SECS", defaults.schema_cache_ttl_secs)?,
            answer_cache_ttl_secs: parse_var("ANSWER_CACHE_TTL_SECS", defaults.answer_cache_ttl_secs)?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| split_origins(&v))
                .unwrap_or(defaults.allowed_origins),
        })
    }

    /// True when a completion service can be constructed from this config.
    pub fn ai_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
