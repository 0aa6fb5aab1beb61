use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File formats accepted by the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Json,
    Xlsx,
    Xls,
}

impl FileType {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit_once('.')?.1.to_lowercase();
        match ext.as_str() {
            "csv" => Some(FileType::Csv),
            "json" => Some(FileType::Json),
            "xlsx" => Some(FileType::Xlsx),
            "xls" => Some(FileType::Xls),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Csv => ".csv",
            FileType::Json => ".json",
            FileType::Xlsx => ".xlsx",
            FileType::Xls => ".xls",
        }
    }
}

/// Metadata kept for every uploaded dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: Uuid,
    pub name: String,
    pub file_type: FileType,
    pub file_size: usize,
    pub row_count: usize,
    pub column_count: usize,
    /// Bumped every time the content is replaced.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A loaded table plus the identity the caches are keyed on. Id and
/// revision together name one version of the content.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: Uuid,
    pub revision: u64,
    pub frame: DataFrame,
}

impl Dataset {
    pub fn new(id: Uuid, frame: DataFrame) -> Self {
        Self { id, revision: 0, frame }
    }

    pub fn at_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }
}
