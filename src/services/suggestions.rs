use crate::models::response::Suggestion;
use crate::models::{ColumnProfile, SchemaSummary};
use crate::services::classifier::time_like_column;

const MAX_SUGGESTIONS: usize = 6;

/// Questions worth asking about a dataset, derived from its schema alone.
pub fn suggest(schema: &SchemaSummary) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let time_column = time_like_column(schema);
    let category_column = schema.low_cardinality_columns().next();

    if let Some(time) = time_column {
        if let Some(value) = first_numeric_except(schema, &time.name) {
            suggestions.push(suggestion(
                "trend",
                format!("How does {} change over {}?", value.name, time.name),
                format!("Line chart of {} summed per {}", value.name, time.name),
            ));
        }
    }

    if let Some(category) = category_column {
        if let Some(value) = first_numeric_except(schema, &category.name) {
            suggestions.push(suggestion(
                "comparison",
                format!("Compare {} across different {}", value.name, category.name),
                format!("Bar chart of {} totals for each {}", value.name, category.name),
            ));
        }
        suggestions.push(suggestion(
            "distribution",
            format!("What is the distribution of {}?", category.name),
            format!("Share of rows for each value of {}", category.name),
        ));
    }

    let mut numeric = schema.numeric_columns();
    if let (Some(x), Some(y)) = (numeric.next(), numeric.next()) {
        suggestions.push(suggestion(
            "correlation",
            format!("What is the relationship between {} and {}?", x.name, y.name),
            format!("Scatter plot and correlation of {} against {}", x.name, y.name),
        ));
    }

    suggestions.push(suggestion(
        "anomaly",
        "Are there any outliers or unusual values in the data?".to_string(),
        "Look for values that stand out from the rest".to_string(),
    ));
    suggestions.push(suggestion(
        "quality",
        "How complete is the data and which columns have missing values?".to_string(),
        "Overview of null counts and distinct values per column".to_string(),
    ));

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

fn first_numeric_except<'a>(schema: &'a SchemaSummary, name: &str) -> Option<&'a ColumnProfile> {
    schema.numeric_columns().find(|c| c.name != name)
}

fn suggestion(kind: &str, question: String, description: String) -> Suggestion {
    Suggestion {
        question,
        kind: kind.to_string(),
        description,
    }
}
