use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Analytical operation a question resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Trend,
    Comparison,
    Distribution,
    Correlation,
    Basic,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Trend => "trend",
            QueryType::Comparison => "comparison",
            QueryType::Distribution => "distribution",
            QueryType::Correlation => "correlation",
            QueryType::Basic => "basic",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "trend" => Some(QueryType::Trend),
            "comparison" => Some(QueryType::Comparison),
            "distribution" => Some(QueryType::Distribution),
            "correlation" => Some(QueryType::Correlation),
            "basic" => Some(QueryType::Basic),
            _ => None,
        }
    }

    /// Roles that must be bound before the executor can run this intent.
    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            QueryType::Trend => &[Role::Time, Role::Value],
            QueryType::Comparison => &[Role::Category, Role::Value],
            QueryType::Distribution => &[Role::Target],
            QueryType::Correlation => &[Role::X, Role::Y],
            QueryType::Basic => &[],
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part a column plays in an intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Time,
    Value,
    Category,
    Target,
    X,
    Y,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Time => "time",
            Role::Value => "value",
            Role::Category => "category",
            Role::Target => "target",
            Role::X => "x",
            Role::Y => "y",
        }
    }

    /// Roles whose column gets summed or correlated.
    pub fn needs_numeric(&self) -> bool {
        matches!(self, Role::Value | Role::X | Role::Y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Bar,
    Pie,
    Scatter,
    Histogram,
}

impl ChartType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "line" => Some(ChartType::Line),
            "bar" => Some(ChartType::Bar),
            "pie" => Some(ChartType::Pie),
            "scatter" => Some(ChartType::Scatter),
            "histogram" => Some(ChartType::Histogram),
            _ => None,
        }
    }
}

/// Structured output of question classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub query_type: QueryType,
    pub bindings: BTreeMap<Role, String>,
    pub chart_hint: ChartType,
    pub rationale: String,
}

impl Intent {
    pub fn basic(rationale: impl Into<String>) -> Self {
        Self {
            query_type: QueryType::Basic,
            bindings: BTreeMap::new(),
            chart_hint: ChartType::Bar,
            rationale: rationale.into(),
        }
    }

    pub fn binding(&self, role: Role) -> Option<&str> {
        self.bindings.get(&role).map(String::as_str)
    }
}

/// Grouping key with the natural order used for sorted output:
/// nulls first, then numbers ascending, then text lexicographically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    Null,
    Number(f64),
    Text(String),
}

impl GroupKey {
    pub fn is_null(&self) -> bool {
        matches!(self, GroupKey::Null)
    }

    pub fn to_json(&self) -> Value {
        match self {
            GroupKey::Null => Value::Null,
            GroupKey::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            GroupKey::Text(s) => Value::String(s.clone()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            GroupKey::Null => 0,
            GroupKey::Number(_) => 1,
            GroupKey::Text(_) => 2,
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        GroupKey::Text(s.to_string())
    }
}

/// One entry of a chart series. Keyed points come first so that untagged
/// deserialization never mistakes them for scatter points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataPoint {
    Keyed { key: GroupKey, value: f64 },
    Scatter { x: Option<f64>, y: Option<f64> },
}

impl DataPoint {
    pub fn keyed(key: GroupKey, value: f64) -> Self {
        DataPoint::Keyed { key, value }
    }
}

/// Chart-ready output of executing an intent against a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub chart_type: ChartType,
    pub series: Vec<DataPoint>,
    pub x_axis_label: String,
    pub y_axis_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Trend,
    Pattern,
    Anomaly,
    Recommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    High,
    Medium,
    Low,
}

/// Human readable observation about an aggregated result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub importance: Importance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_natural_order() {
        let mut keys = vec![
            GroupKey::from("b"),
            GroupKey::Number(10.0),
            GroupKey::Null,
            GroupKey::Number(-2.5),
            GroupKey::from("a"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                GroupKey::Null,
                GroupKey::Number(-2.5),
                GroupKey::Number(10.0),
                GroupKey::from("a"),
                GroupKey::from("b"),
            ]
        );
    }

    #[test]
    fn test_intent_serializes_roles_as_strings() {
        let mut intent = Intent::basic("test");
        intent.query_type = QueryType::Trend;
        intent.bindings.insert(Role::Time, "month".to_string());
        intent.bindings.insert(Role::Value, "revenue".to_string());

        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["query_type"], "trend");
        assert_eq!(json["bindings"]["time"], "month");
        assert_eq!(json["bindings"]["value"], "revenue");

        let back: Intent = serde_json::from_value(json).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn test_data_points_keep_their_shape_through_json() {
        let series = vec![
            DataPoint::keyed(GroupKey::from("north"), 12.0),
            DataPoint::keyed(GroupKey::Null, 1.0),
            DataPoint::Scatter { x: Some(1.0), y: None },
        ];
        let text = serde_json::to_string(&series).unwrap();
        let back: Vec<DataPoint> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, series);
    }
}
