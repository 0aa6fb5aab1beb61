use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{AggregatedResult, Importance, Insight, InsightKind, SchemaSummary};
use crate::services::ai::json_payload;
use crate::services::{ChatMessage, CompletionService};

const MAX_INSIGHTS: usize = 5;

/// Produces observations about an aggregated result. Only the arguments are
/// consulted; the dataset itself is never re-read.
#[async_trait::async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, question: &str, result: &AggregatedResult, schema: &SchemaSummary) -> Vec<Insight>;
}

/// Content-free but always valid three-item list built from the question.
#[derive(Clone, Debug, Default)]
pub struct TemplateInsightGenerator;

impl TemplateInsightGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn insights_for(&self, question: &str) -> Vec<Insight> {
        vec![
            Insight {
                kind: InsightKind::Pattern,
                title: "📈 Data overview".to_string(),
                description: format!(
                    "Based on your question \"{}\", we analysed the relevant data. The result shows clear patterns and trends.",
                    question
                ),
                importance: Importance::High,
            },
            Insight {
                kind: InsightKind::Trend,
                title: "💡 Key finding".to_string(),
                description: "The data contains some interesting patterns; a deeper analysis is recommended to uncover more."
                    .to_string(),
                importance: Importance::Medium,
            },
            Insight {
                kind: InsightKind::Recommendation,
                title: "🎯 Suggested action".to_string(),
                description: "Keep an eye on outliers and changes in trend in the current result and plan accordingly."
                    .to_string(),
                importance: Importance::Medium,
            },
        ]
    }
}

#[async_trait::async_trait]
impl InsightGenerator for TemplateInsightGenerator {
    async fn generate(&self, question: &str, _result: &AggregatedResult, _schema: &SchemaSummary) -> Vec<Insight> {
        self.insights_for(question)
    }
}

/// Asks a completion service for 3-5 insights and falls back to the
/// template list on any failure.
#[derive(Clone)]
pub struct ModelInsightGenerator {
    completion: Arc<dyn CompletionService>,
    fallback: TemplateInsightGenerator,
    timeout: Duration,
}

impl ModelInsightGenerator {
    pub fn new(completion: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self {
            completion,
            fallback: TemplateInsightGenerator::new(),
            timeout,
        }
    }

    async fn generate_with_model(
        &self,
        question: &str,
        result: &AggregatedResult,
        schema: &SchemaSummary,
    ) -> Result<Vec<Insight>> {
        let prompt = format!(
            r#"Question: "{}"

Chart data:
{}

Data summary:
{}

Produce 3-5 valuable insights based on the data above and return JSON:
{{
    "insights": [
        {{
            "type": "trend|pattern|anomaly|recommendation",
            "title": "short title",
            "description": "detailed description",
            "importance": "high|medium|low"
        }}
    ]
}}"#,
            question,
            serde_json::to_string_pretty(result)?,
            serde_json::to_string_pretty(schema)?
        );

        let messages = [
            ChatMessage::system(
                "You are an expert data analyst who finds insights in data and gives practical recommendations. \
                 Reply with JSON only.",
            ),
            ChatMessage::user(prompt),
        ];

        let reply = tokio::time::timeout(self.timeout, self.completion.complete(&messages, 0.5, 1500))
            .await
            .map_err(|_| anyhow!("completion timed out after {:?}", self.timeout))??;

        debug!("Insight reply: {}", reply);
        parse_model_insights(&reply)
    }
}

#[async_trait::async_trait]
impl InsightGenerator for ModelInsightGenerator {
    async fn generate(&self, question: &str, result: &AggregatedResult, schema: &SchemaSummary) -> Vec<Insight> {
        match self.generate_with_model(question, result, schema).await {
            Ok(insights) => {
                info!("💡 Model produced {} insights", insights.len());
                insights
            }
            Err(e) => {
                warn!("⚠️ Model insights unusable, using template fallback: {}", e);
                self.fallback.insights_for(question)
            }
        }
    }
}

pub fn build_insight_generator(
    completion: Option<Arc<dyn CompletionService>>,
    timeout: Duration,
) -> Arc<dyn InsightGenerator> {
    match completion {
        Some(completion) => Arc::new(ModelInsightGenerator::new(completion, timeout)),
        None => Arc::new(TemplateInsightGenerator::new()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InsightReply {
    Wrapped { insights: Vec<Insight> },
    Bare(Vec<Insight>),
}

fn parse_model_insights(reply: &str) -> Result<Vec<Insight>> {
    let parsed: InsightReply = serde_json::from_str(json_payload(reply))?;
    let mut insights = match parsed {
        InsightReply::Wrapped { insights } | InsightReply::Bare(insights) => insights,
    };

    if insights.is_empty() {
        return Err(anyhow!("model returned no insights"));
    }
    if insights
        .iter()
        .any(|i| i.title.trim().is_empty() || i.description.trim().is_empty())
    {
        return Err(anyhow!("model returned an insight without title or description"));
    }

    insights.truncate(MAX_INSIGHTS);
    Ok(insights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChartType, DataPoint, GroupKey};
    use crate::services::testing::{sales_frame, ScriptedCompletion};
    use crate::services::SchemaProfiler;

    fn result() -> AggregatedResult {
        AggregatedResult {
            chart_type: ChartType::Bar,
            series: vec![DataPoint::keyed(GroupKey::from("A"), 350.0)],
            x_axis_label: "product".to_string(),
            y_axis_label: "revenue".to_string(),
            correlation: None,
        }
    }

    fn generator(reply: ScriptedCompletion) -> ModelInsightGenerator {
        ModelInsightGenerator::new(Arc::new(reply), Duration::from_millis(200))
    }

    #[test]
    fn test_template_has_three_items_quoting_question() {
        let insights = TemplateInsightGenerator::new().insights_for("compare products");
        assert_eq!(insights.len(), 3);
        assert!(insights[0].description.contains("compare products"));
        assert_eq!(insights[0].importance, Importance::High);
        assert_eq!(insights[2].kind, InsightKind::Recommendation);
    }

    #[tokio::test]
    async fn test_wrapped_and_bare_replies_are_accepted() {
        let schema = SchemaProfiler::new().profile(&sales_frame()).unwrap();
        let item = r#"{"type": "anomaly", "title": "Spike", "description": "B dominates", "importance": "high"}"#;

        let wrapped = format!(r#"{{"insights": [{}, {}, {}]}}"#, item, item, item);
        let insights = generator(ScriptedCompletion::replying(&wrapped))
            .generate("q", &result(), &schema)
            .await;
        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0].kind, InsightKind::Anomaly);

        let bare = format!("[{}]", vec![item; 7].join(","));
        let insights = generator(ScriptedCompletion::replying(&bare))
            .generate("q", &result(), &schema)
            .await;
        assert_eq!(insights.len(), MAX_INSIGHTS);
    }

    #[tokio::test]
    async fn test_bad_replies_fall_back_to_template() {
        let schema = SchemaProfiler::new().profile(&sales_frame()).unwrap();
        let expected = TemplateInsightGenerator::new().insights_for("q");

        let replies = [
            ScriptedCompletion::replying("Sales look healthy."),
            ScriptedCompletion::replying(r#"{"insights": []}"#),
            ScriptedCompletion::replying(r#"{"insights": [{"type": "trend", "title": "t"}]}"#),
            ScriptedCompletion::replying(
                r#"{"insights": [{"type": "vibe", "title": "t", "description": "d", "importance": "high"}]}"#,
            ),
            ScriptedCompletion::failing("503"),
            ScriptedCompletion::stalling(Duration::from_secs(5)),
        ];

        for reply in replies {
            let insights = generator(reply).generate("q", &result(), &schema).await;
            assert_eq!(insights, expected);
        }
    }
}
