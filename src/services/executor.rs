use anyhow::anyhow;
use log::{debug, info};
use polars::prelude::*;
use std::collections::BTreeMap;

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{AggregatedResult, ChartType, ColumnType, DataPoint, GroupKey, Intent, QueryType, Role};
use crate::services::profiler::{column_keys, column_type, numeric_values};

/// Row cap for the scatter and single-numeric previews of a basic intent.
const PREVIEW_ROWS: usize = 20;
/// Slice cap for the most-frequent-values pie of a basic intent.
const TOP_VALUES: usize = 10;

/// Turns an [`Intent`] into chart-ready data. Pure and deterministic.
#[derive(Clone, Debug, Default)]
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, df: &DataFrame, intent: &Intent) -> AnalysisResult<AggregatedResult> {
        debug!("Executing {} intent with bindings {:?}", intent.query_type, intent.bindings);

        let result = match intent.query_type {
            QueryType::Trend => {
                let time = bound_column(df, intent, Role::Time)?;
                let value = bound_column(df, intent, Role::Value)?;
                grouped_sum(time, value, ChartType::Line)?
            }
            QueryType::Comparison => {
                let category = bound_column(df, intent, Role::Category)?;
                let value = bound_column(df, intent, Role::Value)?;
                grouped_sum(category, value, ChartType::Bar)?
            }
            QueryType::Distribution => {
                let target = bound_column(df, intent, Role::Target)?;
                distribution(target)?
            }
            QueryType::Correlation => {
                let x = bound_column(df, intent, Role::X)?;
                let y = bound_column(df, intent, Role::Y)?;
                correlation(df, x, y)?
            }
            QueryType::Basic => basic(df)?,
        };

        info!(
            "📊 {} intent produced a {:?} chart with {} points",
            intent.query_type,
            result.chart_type,
            result.series.len()
        );
        Ok(result)
    }
}

fn bound_column<'a>(df: &'a DataFrame, intent: &Intent, role: Role) -> AnalysisResult<&'a Series> {
    let name = intent.binding(role).ok_or_else(|| AnalysisError::MissingBinding {
        role: role.as_str().to_string(),
    })?;
    let series = df.column(name).map_err(|_| AnalysisError::UnknownColumn {
        column: name.to_string(),
    })?;
    if role.needs_numeric() && !is_numeric(series) {
        return Err(AnalysisError::NonNumericColumn {
            column: name.to_string(),
        });
    }
    Ok(series)
}

fn is_numeric(s: &Series) -> bool {
    column_type(s.dtype()) == ColumnType::Numeric
}

/// Sum `value` per distinct `key`, keys in natural order. Null keys form
/// their own group so that no row is lost; null values add nothing.
fn grouped_sum(key: &Series, value: &Series, chart_type: ChartType) -> AnalysisResult<AggregatedResult> {
    let keys = column_keys(key)?;
    let values = numeric_values(value)?;

    let mut groups: BTreeMap<GroupKey, f64> = BTreeMap::new();
    for (k, v) in keys.into_iter().zip(values) {
        *groups.entry(k).or_insert(0.0) += v.unwrap_or(0.0);
    }

    Ok(AggregatedResult {
        chart_type,
        series: groups.into_iter().map(|(k, v)| DataPoint::keyed(k, v)).collect(),
        x_axis_label: key.name().to_string(),
        y_axis_label: value.name().to_string(),
        correlation: None,
    })
}

/// Frequency of every distinct non-null value, in first-seen order.
fn value_counts(s: &Series) -> AnalysisResult<Vec<(GroupKey, usize)>> {
    let mut counts: Vec<(GroupKey, usize)> = Vec::new();
    let mut index: BTreeMap<GroupKey, usize> = BTreeMap::new();

    for key in column_keys(s)?.into_iter().filter(|k| !k.is_null()) {
        match index.get(&key) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    Ok(counts)
}

fn sorted_by_value(mut counts: Vec<(GroupKey, usize)>) -> Vec<(GroupKey, usize)> {
    counts.sort_by(|a, b| a.0.cmp(&b.0));
    counts
}

/// Descending frequency; the stable sort keeps first-seen order among ties.
fn sorted_by_frequency(mut counts: Vec<(GroupKey, usize)>) -> Vec<(GroupKey, usize)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn frequency_result(s: &Series, counts: Vec<(GroupKey, usize)>, chart_type: ChartType) -> AggregatedResult {
    AggregatedResult {
        chart_type,
        series: counts
            .into_iter()
            .map(|(k, n)| DataPoint::keyed(k, n as f64))
            .collect(),
        x_axis_label: s.name().to_string(),
        y_axis_label: "count".to_string(),
        correlation: None,
    }
}

fn distribution(target: &Series) -> AnalysisResult<AggregatedResult> {
    let counts = value_counts(target)?;
    if is_numeric(target) {
        Ok(frequency_result(target, sorted_by_value(counts), ChartType::Histogram))
    } else {
        Ok(frequency_result(target, sorted_by_frequency(counts), ChartType::Pie))
    }
}

fn correlation(df: &DataFrame, x: &Series, y: &Series) -> AnalysisResult<AggregatedResult> {
    let pairs = df
        .clone()
        .lazy()
        .select([
            col(x.name()).cast(DataType::Float64).alias("x"),
            col(y.name()).cast(DataType::Float64).alias("y"),
        ])
        .drop_nulls(None)
        .collect()?;

    let xs: Vec<f64> = pairs.column("x")?.f64()?.into_no_null_iter().collect();
    let ys: Vec<f64> = pairs.column("y")?.f64()?.into_no_null_iter().collect();

    let coefficient = match pearson(&xs, &ys) {
        Ok(r) => Some(r),
        Err(e) => {
            debug!("No correlation coefficient for {} / {}: {}", x.name(), y.name(), e);
            None
        }
    };

    Ok(AggregatedResult {
        chart_type: ChartType::Scatter,
        series: xs
            .into_iter()
            .zip(ys)
            .map(|(x, y)| DataPoint::Scatter { x: Some(x), y: Some(y) })
            .collect(),
        x_axis_label: x.name().to_string(),
        y_axis_label: y.name().to_string(),
        correlation: coefficient,
    })
}

/// Adaptive preview when no specific analysis was requested.
fn basic(df: &DataFrame) -> AnalysisResult<AggregatedResult> {
    let numeric: Vec<&Series> = df.get_columns().iter().filter(|s| is_numeric(s)).collect();

    match numeric.as_slice() {
        [x, y, ..] => {
            let xs = numeric_values(x)?;
            let ys = numeric_values(y)?;
            Ok(AggregatedResult {
                chart_type: ChartType::Scatter,
                series: xs
                    .into_iter()
                    .zip(ys)
                    .take(PREVIEW_ROWS)
                    .map(|(x, y)| DataPoint::Scatter { x, y })
                    .collect(),
                x_axis_label: x.name().to_string(),
                y_axis_label: y.name().to_string(),
                correlation: None,
            })
        }
        [only] => {
            let mut counts = sorted_by_value(value_counts(only)?);
            counts.truncate(PREVIEW_ROWS);
            Ok(frequency_result(only, counts, ChartType::Bar))
        }
        [] => {
            let first = df.get_columns().first().ok_or(AnalysisError::EmptyDataset)?;
            let mut counts = sorted_by_frequency(value_counts(first)?);
            counts.truncate(TOP_VALUES);
            Ok(frequency_result(first, counts, ChartType::Pie))
        }
    }
}

/// Pearson correlation coefficient of two equally long samples
fn pearson(xs: &[f64], ys: &[f64]) -> anyhow::Result<f64> {
    if xs.len() != ys.len() {
        return Err(anyhow!("Samples must have the same length"));
    }
    if xs.len() < 2 {
        return Err(anyhow!("Not enough valid data points to compute correlation"));
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov_sum = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov_sum += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x.abs() < f64::EPSILON || var_y.abs() < f64::EPSILON {
        return Err(anyhow!("Cannot compute correlation: one or both samples have zero variance"));
    }

    Ok((cov_sum / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}
