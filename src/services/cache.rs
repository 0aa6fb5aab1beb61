use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::models::response::AnalysisResponse;
use crate::models::SchemaSummary;
use crate::services::CacheBackend;

/// Schema-level and answer-level caching over any [`CacheBackend`].
///
/// The cache is advisory: every backend or serialization failure is logged
/// and reported to the caller as a miss.
#[derive(Clone, Debug)]
pub struct AnalysisCache<C>
where
    C: CacheBackend + Clone + std::fmt::Debug,
{
    backend: C,
    schema_ttl_secs: u64,
    answer_ttl_secs: u64,
}

impl<C> AnalysisCache<C>
where
    C: CacheBackend + Clone + std::fmt::Debug,
{
    pub fn new(backend: C, schema_ttl_secs: u64, answer_ttl_secs: u64) -> Self {
        Self {
            backend,
            schema_ttl_secs,
            answer_ttl_secs,
        }
    }

    /// Keys carry the content revision, so a write that races a replace
    /// lands on a revision nobody reads any more.
    pub fn schema_key(dataset_id: Uuid, revision: u64) -> String {
        format!("{}r{}:info", Self::schema_prefix(dataset_id), revision)
    }

    /// Answer keys hash the question with a name-based UUID so they are
    /// stable across processes.
    pub fn answer_key(dataset_id: Uuid, revision: u64, question: &str) -> String {
        let hash = Uuid::new_v5(&Uuid::NAMESPACE_OID, question.as_bytes());
        format!("{}r{}:{}", Self::answer_prefix(dataset_id), revision, hash.simple())
    }

    fn schema_prefix(dataset_id: Uuid) -> String {
        format!("dataset:{}:", dataset_id)
    }

    fn answer_prefix(dataset_id: Uuid) -> String {
        format!("analysis:{}:", dataset_id)
    }

    pub async fn get_schema(&self, dataset_id: Uuid, revision: u64) -> Option<SchemaSummary> {
        self.get_json(&Self::schema_key(dataset_id, revision)).await
    }

    pub async fn put_schema(&self, dataset_id: Uuid, revision: u64, summary: &SchemaSummary) {
        self.set_json(&Self::schema_key(dataset_id, revision), summary, self.schema_ttl_secs)
            .await
    }

    pub async fn get_answer(&self, dataset_id: Uuid, revision: u64, question: &str) -> Option<AnalysisResponse> {
        self.get_json(&Self::answer_key(dataset_id, revision, question)).await
    }

    pub async fn put_answer(&self, dataset_id: Uuid, revision: u64, question: &str, answer: &AnalysisResponse) {
        self.set_json(&Self::answer_key(dataset_id, revision, question), answer, self.answer_ttl_secs)
            .await
    }

    /// Drop both cache scopes of a dataset, every revision, after its
    /// content changed.
    pub async fn invalidate(&self, dataset_id: Uuid) {
        for prefix in [Self::schema_prefix(dataset_id), Self::answer_prefix(dataset_id)] {
            match self.backend.delete_prefix(&prefix).await {
                Ok(removed) => info!("🧹 Invalidated {} cache entries under {}", removed, prefix),
                Err(e) => warn!("⚠️ Cache prefix delete failed for {}: {}", prefix, e),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss: {}", key);
                return None;
            }
            Err(e) => {
                warn!("⚠️ Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("⚠️ Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                warn!("⚠️ Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.backend.set_with_expiry(key, &serialized, ttl_secs).await {
            warn!("⚠️ Cache write failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnProfile, ColumnType};
    use crate::services::MemoryCacheService;
    use anyhow::anyhow;

    #[derive(Clone, Debug)]
    struct BrokenBackend;

    #[async_trait::async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Err(anyhow!("backend unavailable"))
        }
        async fn set_with_expiry(&self, _key: &str, _value: &str, _expiry_secs: u64) -> anyhow::Result<()> {
            Err(anyhow!("backend unavailable"))
        }
        async fn delete(&self, _key: &str) -> anyhow::Result<()> {
            Err(anyhow!("backend unavailable"))
        }
        async fn delete_prefix(&self, _prefix: &str) -> anyhow::Result<usize> {
            Err(anyhow!("backend unavailable"))
        }
    }

    fn summary() -> SchemaSummary {
        SchemaSummary {
            row_count: 2,
            column_count: 1,
            columns: vec![ColumnProfile {
                name: "amount".to_string(),
                dtype: ColumnType::Numeric,
                null_count: 0,
                unique_count: 2,
                sample_values: vec![serde_json::json!(1.0), serde_json::json!(2.0)],
                min: Some(1.0),
                max: Some(2.0),
                mean: Some(1.5),
                std: Some(0.7071067811865476),
            }],
        }
    }

    #[test]
    fn test_answer_key_is_stable_and_question_specific() {
        let id = Uuid::new_v4();
        let a = AnalysisCache::<MemoryCacheService>::answer_key(id, 0, "revenue trend");
        let b = AnalysisCache::<MemoryCacheService>::answer_key(id, 0, "revenue trend");
        let c = AnalysisCache::<MemoryCacheService>::answer_key(id, 0, "compare products");
        let d = AnalysisCache::<MemoryCacheService>::answer_key(id, 1, "revenue trend");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.starts_with(&format!("analysis:{}:r0:", id)));
        assert_eq!(
            AnalysisCache::<MemoryCacheService>::schema_key(id, 2),
            format!("dataset:{}:r2:info", id)
        );
    }

    #[tokio::test]
    async fn test_schema_round_trips_until_invalidated() {
        let cache = AnalysisCache::new(MemoryCacheService::new(), 3600, 1800);
        let id = Uuid::new_v4();

        assert!(cache.get_schema(id, 0).await.is_none());
        cache.put_schema(id, 0, &summary()).await;
        cache.put_schema(id, 1, &summary()).await;
        assert_eq!(cache.get_schema(id, 0).await, Some(summary()));
        assert!(cache.get_schema(id, 2).await.is_none());

        cache.invalidate(id).await;
        assert!(cache.get_schema(id, 0).await.is_none());
        assert!(cache.get_schema(id, 1).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let backend = MemoryCacheService::new();
        let id = Uuid::new_v4();
        backend
            .set_with_expiry(&AnalysisCache::<MemoryCacheService>::schema_key(id, 0), "{not json", 60)
            .unwrap();

        let cache = AnalysisCache::new(backend, 3600, 1800);
        assert!(cache.get_schema(id, 0).await.is_none());
    }

    #[tokio::test]
    async fn test_backend_failures_are_misses() {
        let cache = AnalysisCache::new(BrokenBackend, 3600, 1800);
        let id = Uuid::new_v4();
        cache.put_schema(id, 0, &summary()).await;
        assert!(cache.get_schema(id, 0).await.is_none());
        cache.invalidate(id).await;
    }
}
