use log::{info, warn};
use polars::io::json::{JsonFormat, JsonReader, JsonWriter};
use polars::prelude::*;
use serde_json::Value;
use std::io::Cursor;

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::FileType;

/// Parse an uploaded file into a `DataFrame`.
pub fn load_dataset(bytes: &[u8], file_type: FileType) -> AnalysisResult<DataFrame> {
    let df = match file_type {
        FileType::Csv => parse_csv(bytes)?,
        FileType::Json => parse_json(bytes)?,
        FileType::Xlsx | FileType::Xls => {
            return Err(AnalysisError::UnsupportedFileType(format!(
                "{} spreadsheets are not supported, export the sheet as CSV",
                file_type.extension()
            )))
        }
    };

    if df.width() == 0 {
        return Err(AnalysisError::EmptyDataset);
    }
    Ok(df)
}

/// Strict UTF-8 first, then lossy UTF-8 for legacy encodings.
fn parse_csv(bytes: &[u8]) -> AnalysisResult<DataFrame> {
    let mut last_error = None;

    for encoding in [CsvEncoding::Utf8, CsvEncoding::LossyUtf8] {
        let result = CsvReader::new(Cursor::new(bytes))
            .infer_schema(Some(100))
            .has_header(true)
            .with_encoding(encoding)
            .finish();

        match result {
            Ok(df) => {
                info!("✅ Parsed CSV with {:?}: {} rows, {} columns", encoding, df.height(), df.width());
                return Ok(df);
            }
            Err(e) => {
                warn!("⚠️ CSV parse with {:?} failed: {}", encoding, e);
                last_error = Some(e);
            }
        }
    }

    Err(AnalysisError::UnreadableDataset(
        last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "CSV could not be parsed".to_string()),
    ))
}

/// A JSON array of objects is one row per object; a single object is one row.
fn parse_json(bytes: &[u8]) -> AnalysisResult<DataFrame> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| AnalysisError::UnreadableDataset(format!("invalid JSON: {}", e)))?;

    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(_) => vec![value],
        _ => {
            return Err(AnalysisError::UnreadableDataset(
                "JSON must be an array of objects or a single object".to_string(),
            ))
        }
    };

    if rows.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }
    if !rows.iter().all(Value::is_object) {
        return Err(AnalysisError::UnreadableDataset(
            "every JSON array element must be an object".to_string(),
        ));
    }

    let normalized = serde_json::to_vec(&rows)
        .map_err(|e| AnalysisError::UnreadableDataset(e.to_string()))?;
    let df = JsonReader::new(Cursor::new(normalized))
        .with_json_format(JsonFormat::Json)
        .finish()?;

    info!("✅ Parsed JSON: {} rows, {} columns", df.height(), df.width());
    Ok(df)
}

/// First `limit` rows as JSON records, nulls rendered as empty strings.
pub fn preview_records(df: &DataFrame, limit: usize) -> AnalysisResult<Vec<Value>> {
    let mut head = df.head(Some(limit));
    let mut buf = Vec::new();
    JsonWriter::new(&mut buf)
        .with_json_format(JsonFormat::Json)
        .finish(&mut head)?;

    let mut records: Vec<Value> = serde_json::from_slice(&buf)
        .map_err(|e| AnalysisError::UnreadableDataset(format!("preview serialization failed: {}", e)))?;

    for record in records.iter_mut() {
        if let Value::Object(fields) = record {
            for field in fields.values_mut() {
                if field.is_null() {
                    *field = Value::String(String::new());
                }
            }
        }
    }
    Ok(records)
}
