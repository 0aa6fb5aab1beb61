use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{AggregatedResult, ColumnProfile, DatasetRecord, Insight, Intent, QueryType, SchemaSummary};

/// Response for file upload endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub dataset: DatasetRecord,
    pub columns: Vec<ColumnProfile>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatasetDetail {
    pub dataset: DatasetRecord,
    pub profile: SchemaSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub total_rows: usize,
    pub preview_rows: usize,
    pub columns: Vec<String>,
    pub data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub limit: Option<usize>,
}

/// Request to analyse a dataset with a natural language question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub dataset_id: Uuid,
    pub question: String,
}

/// Full answer to a question; this is what the answer cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub dataset_id: Uuid,
    pub question: String,
    pub query_type: QueryType,
    pub intent: Intent,
    pub chart: AggregatedResult,
    pub insights: Vec<Insight>,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

/// Question the user could ask next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub dataset_id: Uuid,
    pub dataset_name: String,
    pub suggestions: Vec<Suggestion>,
}

/// Error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status_code: u16,
}
