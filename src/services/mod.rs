pub mod ai;
pub mod analysis;
pub mod cache;
pub mod classifier;
pub mod dataset_store;
pub mod executor;
pub mod insights;
pub mod loader;
pub mod memory_cache;
pub mod profiler;
pub mod redis;
pub mod suggestions;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Key-value store behind the analysis caches. Values are opaque strings.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set_with_expiry(&self, key: &str, value: &str, expiry_secs: u64) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn delete_prefix(&self, prefix: &str) -> Result<usize>;
}

/// One role-tagged message of a completion prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// External text-completion service used by the model-backed strategies.
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync + 'static {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32, max_tokens: u32) -> Result<String>;
}

#[async_trait::async_trait]
impl CacheBackend for memory_cache::MemoryCacheService {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get(key)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, expiry_secs: u64) -> Result<()> {
        self.set_with_expiry(key, value, expiry_secs)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.delete(key)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        self.delete_prefix(prefix)
    }
}

#[cfg(feature = "external-services")]
#[async_trait::async_trait]
impl CacheBackend for redis::RedisService {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get(key).await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, expiry_secs: u64) -> Result<()> {
        self.set_with_expiry(key, value, expiry_secs).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        self.delete_prefix(prefix).await
    }
}

#[async_trait::async_trait]
impl CompletionService for ai::OpenAIService {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32, max_tokens: u32) -> Result<String> {
        self.chat(messages, temperature, max_tokens).await
    }
}

// Re-export the services
#[cfg(feature = "external-services")]
pub use self::redis::RedisService;
pub use ai::OpenAIService;
pub use analysis::AnalysisService;
pub use cache::AnalysisCache;
pub use classifier::IntentClassifier;
pub use dataset_store::DatasetStore;
pub use executor::QueryExecutor;
pub use insights::InsightGenerator;
pub use memory_cache::MemoryCacheService;
pub use profiler::SchemaProfiler;
