use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{error, info};
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::models::{Dataset, DatasetRecord, FileType};

#[derive(Debug, Clone)]
struct StoredDataset {
    record: DatasetRecord,
    frame: DataFrame,
}

/// In-memory registry of uploaded datasets. Content is kept parsed so
/// questions never re-read the upload.
#[derive(Clone, Debug, Default)]
pub struct DatasetStore {
    data: Arc<Mutex<HashMap<Uuid, StoredDataset>>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        info!("🗄️ In-memory dataset store initialized");
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, StoredDataset>>> {
        self.data.lock().map_err(|e| {
            error!("Failed to lock dataset store: {}", e);
            anyhow!("Failed to lock dataset store")
        })
    }

    pub fn insert(&self, name: &str, file_type: FileType, file_size: usize, frame: DataFrame) -> Result<DatasetRecord> {
        let record = DatasetRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            file_type,
            file_size,
            row_count: frame.height(),
            column_count: frame.width(),
            revision: 0,
            created_at: Utc::now(),
            updated_at: None,
        };

        info!(
            "📤 Storing dataset {} ({}, {} bytes, {}x{})",
            record.id, record.name, record.file_size, record.row_count, record.column_count
        );
        self.lock()?.insert(
            record.id,
            StoredDataset {
                record: record.clone(),
                frame,
            },
        );
        Ok(record)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<DatasetRecord>> {
        Ok(self.lock()?.get(&id).map(|stored| stored.record.clone()))
    }

    /// Record plus the parsed table, ready for analysis.
    pub fn dataset(&self, id: Uuid) -> Result<Option<(DatasetRecord, Dataset)>> {
        Ok(self
            .lock()?
            .get(&id)
            .map(|stored| {
                let dataset = Dataset::new(id, stored.frame.clone()).at_revision(stored.record.revision);
                (stored.record.clone(), dataset)
            }))
    }

    /// All records, oldest first.
    pub fn list(&self) -> Result<Vec<DatasetRecord>> {
        let mut records: Vec<DatasetRecord> = self.lock()?.values().map(|s| s.record.clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    /// Swap in new content for an existing dataset. Callers must invalidate
    /// the dataset's caches afterwards.
    pub fn replace(&self, id: Uuid, file_size: usize, frame: DataFrame) -> Result<Option<DatasetRecord>> {
        let mut storage = self.lock()?;
        let Some(stored) = storage.get_mut(&id) else {
            return Ok(None);
        };

        stored.record.file_size = file_size;
        stored.record.row_count = frame.height();
        stored.record.column_count = frame.width();
        stored.record.revision += 1;
        stored.record.updated_at = Some(Utc::now());
        stored.frame = frame;

        info!("🔄 Replaced content of dataset {}", id);
        Ok(Some(stored.record.clone()))
    }

    pub fn remove(&self, id: Uuid) -> Result<bool> {
        let removed = self.lock()?.remove(&id).is_some();
        if removed {
            info!("🗑️ Removed dataset {}", id);
        }
        Ok(removed)
    }
}
