use chrono::Utc;
use log::{info, warn};
use polars::prelude::DataFrame;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AnalysisResult;
use crate::models::response::{AnalysisResponse, Suggestion};
use crate::models::{Dataset, SchemaSummary};
use crate::services::classifier::build_classifier;
use crate::services::insights::build_insight_generator;
use crate::services::{
    suggestions, AnalysisCache, CacheBackend, CompletionService, InsightGenerator, IntentClassifier, QueryExecutor,
    SchemaProfiler,
};

/// Question resolution pipeline: profile, classify, execute, explain.
///
/// Every component is stateless; the only state shared between requests
/// lives in the cache backend.
#[derive(Clone)]
pub struct AnalysisService<C>
where
    C: CacheBackend + Clone + Debug,
{
    profiler: SchemaProfiler,
    classifier: Arc<dyn IntentClassifier>,
    executor: QueryExecutor,
    insights: Arc<dyn InsightGenerator>,
    cache: AnalysisCache<C>,
}

impl<C> AnalysisService<C>
where
    C: CacheBackend + Clone + Debug,
{
    pub fn new(
        cache: AnalysisCache<C>,
        classifier: Arc<dyn IntentClassifier>,
        insights: Arc<dyn InsightGenerator>,
    ) -> Self {
        Self {
            profiler: SchemaProfiler::new(),
            classifier,
            executor: QueryExecutor::new(),
            insights,
            cache,
        }
    }

    /// Wire the model-backed strategies when a completion service is given,
    /// the deterministic ones otherwise.
    pub fn from_config(config: &Config, backend: C, completion: Option<Arc<dyn CompletionService>>) -> Self {
        let timeout = Duration::from_secs(config.llm_timeout_secs);
        let cache = AnalysisCache::new(backend, config.schema_cache_ttl_secs, config.answer_cache_ttl_secs);

        Self::new(
            cache,
            build_classifier(completion.clone(), timeout),
            build_insight_generator(completion, timeout),
        )
    }

    /// Schema summary of a dataset, served from the schema cache when present.
    pub async fn profile(&self, dataset: &Dataset) -> AnalysisResult<SchemaSummary> {
        if let Some(summary) = self.cache.get_schema(dataset.id, dataset.revision).await {
            return Ok(summary);
        }

        let summary = self.summarize(&dataset.frame)?;
        info!(
            "📊 Profiled dataset {} r{}: {} rows, {} columns",
            dataset.id, dataset.revision, summary.row_count, summary.column_count
        );
        self.remember_profile(dataset, &summary).await;
        Ok(summary)
    }

    /// Profile a frame without touching the cache, so uploads can be
    /// validated before anything is stored.
    pub fn summarize(&self, frame: &DataFrame) -> AnalysisResult<SchemaSummary> {
        self.profiler.profile(frame)
    }

    pub async fn remember_profile(&self, dataset: &Dataset, summary: &SchemaSummary) {
        self.cache.put_schema(dataset.id, dataset.revision, summary).await
    }

    /// Answer a natural-language question about a dataset.
    pub async fn resolve(&self, dataset: &Dataset, question: &str) -> AnalysisResult<AnalysisResponse> {
        if let Some(answer) = self.cache.get_answer(dataset.id, dataset.revision, question).await {
            info!("✅ Answer cache hit for dataset {}", dataset.id);
            return Ok(answer);
        }

        let start_time = Instant::now();
        let schema = self.profile(dataset).await?;

        let intent = self.classifier.classify(question, &schema).await;
        info!("🧭 [{}] Classified \"{}\" as {}", dataset.id, question, intent.query_type);

        let chart = self.executor.execute(&dataset.frame, &intent).map_err(|e| {
            warn!("❌ [{}] Executing {} intent failed: {}", dataset.id, intent.query_type, e);
            e
        })?;

        let insights = self.insights.generate(question, &chart, &schema).await;

        let answer = AnalysisResponse {
            dataset_id: dataset.id,
            question: question.to_string(),
            query_type: intent.query_type,
            reasoning: intent.rationale.clone(),
            intent,
            chart,
            insights,
            created_at: Utc::now(),
        };

        self.cache.put_answer(dataset.id, dataset.revision, question, &answer).await;
        info!("✅ [{}] Resolved question in {:.2?}", dataset.id, start_time.elapsed());
        Ok(answer)
    }

    pub async fn suggestions(&self, dataset: &Dataset) -> AnalysisResult<Vec<Suggestion>> {
        let schema = self.profile(dataset).await?;
        Ok(suggestions::suggest(&schema))
    }

    /// Forget everything cached for a dataset whose content changed.
    pub async fn invalidate(&self, dataset_id: Uuid) {
        self.cache.invalidate(dataset_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::models::{ChartType, DataPoint, GroupKey, QueryType, Role};
    use crate::services::testing::{sales_frame, ScriptedCompletion};
    use crate::services::MemoryCacheService;
    use polars::prelude::*;
    use std::sync::atomic::Ordering;

    fn deterministic_service() -> AnalysisService<MemoryCacheService> {
        AnalysisService::from_config(&Config::default(), MemoryCacheService::new(), None)
    }

    fn keyed(series: &[DataPoint]) -> Vec<(GroupKey, f64)> {
        series
            .iter()
            .map(|p| match p {
                DataPoint::Keyed { key, value } => (key.clone(), *value),
                other => panic!("unexpected point {:?}", other),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_trend_question_end_to_end() {
        let service = deterministic_service();
        let dataset = Dataset::new(Uuid::new_v4(), sales_frame());

        let answer = service.resolve(&dataset, "revenue trend by month").await.unwrap();
        assert_eq!(answer.query_type, QueryType::Trend);
        assert_eq!(answer.intent.binding(Role::Time), Some("month"));
        assert_eq!(answer.intent.binding(Role::Value), Some("revenue"));
        assert_eq!(answer.chart.chart_type, ChartType::Line);
        assert_eq!(
            keyed(&answer.chart.series),
            vec![
                (GroupKey::from("2024-01"), 300.0),
                (GroupKey::from("2024-02"), 270.0),
                (GroupKey::from("2024-03"), 370.0),
                (GroupKey::from("2024-04"), 350.0),
            ]
        );
        assert_eq!(answer.insights.len(), 3);
        assert_eq!(answer.reasoning, answer.intent.rationale);
    }

    #[tokio::test]
    async fn test_comparison_question_end_to_end() {
        let service = deterministic_service();
        let dataset = Dataset::new(Uuid::new_v4(), sales_frame());

        let answer = service.resolve(&dataset, "compare products").await.unwrap();
        assert_eq!(answer.query_type, QueryType::Comparison);
        assert_eq!(answer.intent.binding(Role::Category), Some("product"));
        assert_eq!(answer.chart.chart_type, ChartType::Bar);

        let series = keyed(&answer.chart.series);
        assert_eq!(
            series,
            vec![
                (GroupKey::from("A"), 350.0),
                (GroupKey::from("B"), 630.0),
                (GroupKey::from("C"), 310.0),
            ]
        );
        let total: f64 = series.iter().map(|(_, v)| v).sum();
        assert_eq!(total, 1290.0);
    }

    #[tokio::test]
    async fn test_text_only_dataset_falls_back_to_top_values() {
        let service = deterministic_service();
        let frame = df!("colour" => &["red", "blue", "red", "green", "red", "blue"]).unwrap();
        let dataset = Dataset::new(Uuid::new_v4(), frame);

        let answer = service.resolve(&dataset, "tell me something").await.unwrap();
        assert_eq!(answer.query_type, QueryType::Basic);
        assert_eq!(answer.chart.chart_type, ChartType::Pie);
        assert_eq!(
            keyed(&answer.chart.series),
            vec![
                (GroupKey::from("red"), 3.0),
                (GroupKey::from("blue"), 2.0),
                (GroupKey::from("green"), 1.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_cached_answer_skips_the_model_until_invalidated() {
        let completion = Arc::new(ScriptedCompletion::replying("not json"));
        let service = AnalysisService::from_config(
            &Config::default(),
            MemoryCacheService::new(),
            Some(completion.clone() as Arc<dyn CompletionService>),
        );
        let dataset = Dataset::new(Uuid::new_v4(), sales_frame());

        let first = service.resolve(&dataset, "compare products").await.unwrap();
        let calls = completion.calls.load(Ordering::SeqCst);
        assert_eq!(calls, 2);

        let second = service.resolve(&dataset, "compare products").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(completion.calls.load(Ordering::SeqCst), calls);

        service.invalidate(dataset.id).await;
        service.resolve(&dataset, "compare products").await.unwrap();
        assert_eq!(completion.calls.load(Ordering::SeqCst), calls + 2);
    }

    #[tokio::test]
    async fn test_profile_is_cached_per_dataset() {
        let service = deterministic_service();
        let id = Uuid::new_v4();

        let summary = service.profile(&Dataset::new(id, sales_frame())).await.unwrap();
        assert_eq!(summary.row_count, 8);

        // Same id, different frame: the cached summary wins until invalidated.
        let other = Dataset::new(id, df!("x" => &[1i64]).unwrap());
        assert_eq!(service.profile(&other).await.unwrap(), summary);

        service.invalidate(id).await;
        assert_eq!(service.profile(&other).await.unwrap().row_count, 1);
    }

    #[tokio::test]
    async fn test_schema_written_for_an_old_revision_is_not_served() {
        let service = deterministic_service();
        let id = Uuid::new_v4();
        let old = Dataset::new(id, sales_frame());
        service.profile(&old).await.unwrap();

        // Content replaced, then a request that still held the old content
        // finishes profiling after the invalidation.
        let new = Dataset::new(
            id,
            df!(
                "region" => &["north", "south", "north", "east", "south", "north", "east", "north"],
                "units" => &[5i64, 3, 2, 7, 1, 4, 6, 8]
            )
            .unwrap(),
        )
        .at_revision(1);
        service.invalidate(id).await;
        service.profile(&old).await.unwrap();

        let answer = service.resolve(&new, "compare regions").await.unwrap();
        assert_eq!(answer.query_type, QueryType::Comparison);
        assert_eq!(answer.intent.binding(Role::Category), Some("region"));
        assert_eq!(service.profile(&new).await.unwrap().row_count, 8);
    }

    #[tokio::test]
    async fn test_invalid_model_binding_still_answers() {
        let reply = r#"{"query_type": "trend", "parameters": {"time_column": "month", "value_column": "ghost"},
            "chart_suggestion": "line", "reasoning": "r"}"#;
        let service = AnalysisService::from_config(
            &Config::default(),
            MemoryCacheService::new(),
            Some(Arc::new(ScriptedCompletion::replying(reply)) as Arc<dyn CompletionService>),
        );
        let dataset = Dataset::new(Uuid::new_v4(), sales_frame());

        let answer = service.resolve(&dataset, "revenue trend by month").await.unwrap();
        assert_eq!(answer.intent.binding(Role::Value), Some("revenue"));
    }

    #[tokio::test]
    async fn test_dataset_without_columns_is_an_input_error() {
        let service = deterministic_service();
        let dataset = Dataset::new(Uuid::new_v4(), DataFrame::empty());

        let result = service.resolve(&dataset, "anything").await;
        assert!(matches!(result, Err(AnalysisError::EmptyDataset)));
    }
}
