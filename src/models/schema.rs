use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse column type used by the classifier and executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Text,
    Temporal,
    Other,
}

/// Statistics for a single column in the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: ColumnType,
    pub null_count: usize,
    pub unique_count: usize,
    pub sample_values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
}

impl ColumnProfile {
    pub fn is_numeric(&self) -> bool {
        self.dtype == ColumnType::Numeric
    }
}

/// Structural summary of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnProfile>,
}

impl SchemaSummary {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Numeric columns in declared order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnProfile> {
        self.columns.iter().filter(|c| c.is_numeric())
    }

    /// Columns with fewer distinct values than half the row count.
    ///
    /// Known limitation: high-cardinality categories and short numeric
    /// columns are both misjudged by this threshold.
    pub fn low_cardinality_columns(&self) -> impl Iterator<Item = &ColumnProfile> {
        let limit = self.row_count as f64 * 0.5;
        self.columns
            .iter()
            .filter(move |c| (c.unique_count as f64) < limit)
    }

    /// Human readable rendering used in model prompts.
    pub fn describe(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let samples: Vec<String> =
                    c.sample_values.iter().take(3).map(|v| v.to_string()).collect();
                format!(
                    "- {}: {:?} (unique: {}, nulls: {}, samples: [{}])",
                    c.name,
                    c.dtype,
                    c.unique_count,
                    c.null_count,
                    samples.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Rows: {}\nColumns: {}\nColumn details:\n{}",
            self.row_count, self.column_count, columns
        )
    }
}
