use polars::prelude::*;

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ColumnProfile, ColumnType, GroupKey, SchemaSummary};

const SAMPLE_SIZE: usize = 5;

/// Produces the structural summary the classifier works from.
#[derive(Clone, Debug, Default)]
pub struct SchemaProfiler;

impl SchemaProfiler {
    pub fn new() -> Self {
        Self
    }

    /// Summarise every column of `df`. Deterministic for a given frame.
    pub fn profile(&self, df: &DataFrame) -> AnalysisResult<SchemaSummary> {
        let row_count = df.height();
        let mut columns = Vec::with_capacity(df.width());

        for s in df.get_columns() {
            if matches!(s.dtype(), DataType::List(_) | DataType::Struct(_)) {
                return Err(AnalysisError::UnreadableDataset(format!(
                    "column '{}' holds nested values",
                    s.name()
                )));
            }
            columns.push(self.profile_column(s)?);
        }

        Ok(SchemaSummary {
            row_count,
            column_count: df.width(),
            columns,
        })
    }

    fn profile_column(&self, s: &Series) -> AnalysisResult<ColumnProfile> {
        let dtype = column_type(s.dtype());
        let null_count = s.null_count();
        let unique_count = s.drop_nulls().n_unique()?;

        let sample_values = column_keys(s)?
            .into_iter()
            .filter(|k| !k.is_null())
            .take(SAMPLE_SIZE)
            .map(|k| k.to_json())
            .collect();

        let mut profile = ColumnProfile {
            name: s.name().to_string(),
            dtype,
            null_count,
            unique_count,
            sample_values,
            min: None,
            max: None,
            mean: None,
            std: None,
        };

        if dtype == ColumnType::Numeric {
            // An all-null column leaves every statistic absent.
            let casted = s.cast(&DataType::Float64)?;
            let ca = casted.f64()?;
            profile.min = ca.min().filter(|v| v.is_finite());
            profile.max = ca.max().filter(|v| v.is_finite());
            profile.mean = ca.mean().filter(|v| v.is_finite());
            profile.std = ca.std(1).filter(|v| v.is_finite());
        }

        Ok(profile)
    }
}

/// Map a polars dtype onto the coarse types the classifier reasons about.
pub fn column_type(dtype: &DataType) -> ColumnType {
    match dtype {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => ColumnType::Numeric,
        DataType::Date | DataType::Datetime(_, _) | DataType::Duration(_) | DataType::Time => {
            ColumnType::Temporal
        }
        DataType::Utf8 => ColumnType::Text,
        _ => ColumnType::Other,
    }
}

/// Values of a column as grouping keys, one per row, in row order.
/// Numeric columns yield numbers; everything else is rendered as text.
pub fn column_keys(s: &Series) -> PolarsResult<Vec<GroupKey>> {
    if column_type(s.dtype()) == ColumnType::Numeric {
        return Ok(numeric_values(s)?
            .into_iter()
            .map(|v| v.map(GroupKey::Number).unwrap_or(GroupKey::Null))
            .collect());
    }

    let casted = s.cast(&DataType::Utf8)?;
    let ca = casted.utf8()?;
    Ok(ca
        .into_iter()
        .map(|v| v.map(GroupKey::from).unwrap_or(GroupKey::Null))
        .collect())
}

/// Values of a numeric column as `f64`, one per row, in row order.
pub fn numeric_values(s: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let casted = s.cast(&DataType::Float64)?;
    let ca = casted.f64()?;
    Ok(ca.into_iter().collect())
}
