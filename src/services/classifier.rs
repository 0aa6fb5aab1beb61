use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ChartType, ColumnProfile, Intent, QueryType, Role, SchemaSummary};
use crate::services::ai::json_payload;
use crate::services::{ChatMessage, CompletionService};

const TREND_KEYWORDS: &[&str] = &[
    "trend", "over time", "change", "growth", "monthly", "yearly",
    "趋势", "变化", "时间", "月份", "年份",
];
const COMPARISON_KEYWORDS: &[&str] = &[
    "compare", "comparison", "versus", " vs ", "difference between", "region", "product", "category",
    "对比", "比较", "地区", "产品", "分类",
];
const DISTRIBUTION_KEYWORDS: &[&str] = &[
    "distribution", "breakdown", "histogram", "spread", "statistics",
    "分布", "分析", "统计",
];
const TEMPORAL_COLUMN_KEYWORDS: &[&str] = &[
    "time", "date", "day", "week", "month", "quarter", "year", "period",
    "时间", "日期", "月", "年",
];

/// First column whose name reads like a time axis.
pub fn time_like_column(schema: &SchemaSummary) -> Option<&ColumnProfile> {
    schema
        .columns
        .iter()
        .find(|c| contains_any(&c.name.to_lowercase(), TEMPORAL_COLUMN_KEYWORDS))
}

/// Maps a question and a schema onto an [`Intent`]. Implementations never
/// fail: anything they cannot resolve comes back as a `basic` intent.
#[async_trait::async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, question: &str, schema: &SchemaSummary) -> Intent;
}

/// Keyword-matching classifier used when no model is configured and as the
/// fallback for the model-backed classifier.
#[derive(Clone, Debug, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of the classifier. Among equally eligible columns
    /// the first one in declared order wins.
    pub fn classify_question(&self, question: &str, schema: &SchemaSummary) -> Intent {
        let question = question.to_lowercase();
        let first_numeric = schema.numeric_columns().next().map(|c| c.name.clone());

        if contains_any(&question, TREND_KEYWORDS) {
            let time_column = time_like_column(schema).map(|c| c.name.clone());

            return match (time_column, first_numeric) {
                (Some(time), Some(value)) => bound_intent(
                    QueryType::Trend,
                    [(Role::Time, time), (Role::Value, value)],
                    ChartType::Line,
                    "Detected trend keywords in the question",
                ),
                _ => Intent::basic("Trend keywords detected but no time and numeric column pair was found"),
            };
        }

        if contains_any(&question, COMPARISON_KEYWORDS) {
            let category_column = schema.low_cardinality_columns().next().map(|c| c.name.clone());

            return match (category_column, first_numeric) {
                (Some(category), Some(value)) => bound_intent(
                    QueryType::Comparison,
                    [(Role::Category, category), (Role::Value, value)],
                    ChartType::Bar,
                    "Detected comparison keywords in the question",
                ),
                _ => Intent::basic("Comparison keywords detected but no category and numeric column pair was found"),
            };
        }

        if contains_any(&question, DISTRIBUTION_KEYWORDS) {
            return match schema.columns.first() {
                Some(target) => bound_intent(
                    QueryType::Distribution,
                    [(Role::Target, target.name.clone())],
                    ChartType::Pie,
                    "Detected distribution keywords in the question",
                ),
                None => Intent::basic("Distribution keywords detected but the dataset has no columns"),
            };
        }

        Intent::basic("No analysis keywords recognised, using basic analysis")
    }
}

#[async_trait::async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, question: &str, schema: &SchemaSummary) -> Intent {
        self.classify_question(question, schema)
    }
}

/// Classifier that asks a completion service first and falls back to
/// [`KeywordClassifier`] on timeout, transport error or unusable output.
#[derive(Clone)]
pub struct ModelClassifier {
    completion: Arc<dyn CompletionService>,
    fallback: KeywordClassifier,
    timeout: Duration,
}

impl ModelClassifier {
    pub fn new(completion: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self {
            completion,
            fallback: KeywordClassifier::new(),
            timeout,
        }
    }

    async fn classify_with_model(&self, question: &str, schema: &SchemaSummary) -> Result<Intent> {
        let messages = [
            ChatMessage::system(
                "You are an expert data analyst who turns questions about a dataset into a structured analysis plan. \
                 Reply with a single JSON object and nothing else.",
            ),
            ChatMessage::user(build_prompt(question, schema)),
        ];

        let reply = tokio::time::timeout(self.timeout, self.completion.complete(&messages, 0.3, 1000))
            .await
            .map_err(|_| anyhow!("completion timed out after {:?}", self.timeout))??;

        debug!("Classifier reply: {}", reply);
        parse_model_intent(&reply, schema)
    }
}

#[async_trait::async_trait]
impl IntentClassifier for ModelClassifier {
    async fn classify(&self, question: &str, schema: &SchemaSummary) -> Intent {
        match self.classify_with_model(question, schema).await {
            Ok(intent) => {
                info!("🧠 Model classified question as {}", intent.query_type);
                intent
            }
            Err(e) => {
                warn!("⚠️ Model classification unusable, using keyword fallback: {}", e);
                self.fallback.classify_question(question, schema)
            }
        }
    }
}

/// Pick the model-backed classifier when a completion service is available.
pub fn build_classifier(
    completion: Option<Arc<dyn CompletionService>>,
    timeout: Duration,
) -> Arc<dyn IntentClassifier> {
    match completion {
        Some(completion) => Arc::new(ModelClassifier::new(completion, timeout)),
        None => Arc::new(KeywordClassifier::new()),
    }
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    query_type: String,
    parameters: ModelParameters,
    chart_suggestion: String,
    reasoning: String,
}

#[derive(Debug, Deserialize)]
struct ModelParameters {
    time_column: Option<String>,
    value_column: Option<String>,
    category_column: Option<String>,
    column: Option<String>,
    x_column: Option<String>,
    y_column: Option<String>,
}

impl ModelParameters {
    fn for_role(&self, role: Role) -> Option<&str> {
        let column = match role {
            Role::Time => &self.time_column,
            Role::Value => &self.value_column,
            Role::Category => &self.category_column,
            Role::Target => &self.column,
            Role::X => &self.x_column,
            Role::Y => &self.y_column,
        };
        column.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Validate a model reply against the schema. Any failure is an error so
/// that the caller can fall back.
fn parse_model_intent(reply: &str, schema: &SchemaSummary) -> Result<Intent> {
    let parsed: ModelReply = serde_json::from_str(json_payload(reply))?;

    let query_type = QueryType::parse(&parsed.query_type)
        .ok_or_else(|| anyhow!("unknown query_type '{}'", parsed.query_type))?;

    let mut bindings = BTreeMap::new();
    for role in query_type.required_roles() {
        let column = parsed
            .parameters
            .for_role(*role)
            .ok_or_else(|| anyhow!("no column bound for role '{}'", role.as_str()))?;
        let profile = schema
            .column(column)
            .ok_or_else(|| anyhow!("column '{}' is not in the dataset", column))?;
        if role.needs_numeric() && !profile.is_numeric() {
            return Err(anyhow!("column '{}' bound to '{}' is not numeric", column, role.as_str()));
        }
        bindings.insert(*role, column.to_string());
    }

    Ok(Intent {
        query_type,
        bindings,
        chart_hint: ChartType::parse(&parsed.chart_suggestion).unwrap_or_else(|| default_chart(query_type)),
        rationale: parsed.reasoning,
    })
}

fn build_prompt(question: &str, schema: &SchemaSummary) -> String {
    format!(
        r#"Question: "{}"

Dataset:
{}

Choose the analysis that best answers the question and return JSON:
{{
    "query_type": "trend|comparison|distribution|correlation|basic",
    "parameters": {{
        "time_column": "time column (trend)",
        "value_column": "numeric column (trend, comparison)",
        "category_column": "category column (comparison)",
        "column": "target column (distribution)",
        "x_column": "first numeric column (correlation)",
        "y_column": "second numeric column (correlation)"
    }},
    "chart_suggestion": "line|bar|pie|scatter|histogram",
    "reasoning": "why this analysis fits"
}}
Only use column names listed above."#,
        question,
        schema.describe()
    )
}

fn default_chart(query_type: QueryType) -> ChartType {
    match query_type {
        QueryType::Trend => ChartType::Line,
        QueryType::Comparison | QueryType::Basic => ChartType::Bar,
        QueryType::Distribution => ChartType::Pie,
        QueryType::Correlation => ChartType::Scatter,
    }
}

fn bound_intent<const N: usize>(
    query_type: QueryType,
    bindings: [(Role, String); N],
    chart_hint: ChartType,
    rationale: &str,
) -> Intent {
    Intent {
        query_type,
        bindings: bindings.into_iter().collect(),
        chart_hint,
        rationale: rationale.to_string(),
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
