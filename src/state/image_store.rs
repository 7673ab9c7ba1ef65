// In-memory image catalog

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::api::ImageStore;
use crate::core::errors::GachaError;
use crate::core::models::{Image, NewImage, Rarity};

#[derive(Debug, Default)]
struct Records {
    next_id: i64,
    rows: Vec<Image>,
}

/// Process-local [`ImageStore`]; file names are unique.
#[derive(Debug, Default)]
pub struct InMemoryImageStore {
    records: RwLock<Records>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn create(&self, record: NewImage) -> Result<Image, GachaError> {
        let mut records = self.records.write().await;
        if records.rows.iter().any(|row| row.file_name == record.file_name) {
            return Err(GachaError::Conflict(format!(
                "Image {} already exists",
                record.file_name
            )));
        }

        records.next_id += 1;
        let row = Image {
            image_id: records.next_id,
            path: record.path,
            file_name: record.file_name,
            description: record.description,
            rarity: record.rarity,
            created_by: record.created_by.clone(),
            created_on: record.created_on,
            updated_by: record.created_by,
            updated_on: record.created_on,
        };
        records.rows.push(row.clone());
        Ok(row)
    }

    async fn get(&self, image_id: i64) -> Result<Option<Image>, GachaError> {
        let records = self.records.read().await;
        Ok(records.rows.iter().find(|row| row.image_id == image_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Image>, GachaError> {
        Ok(self.records.read().await.rows.clone())
    }

    async fn update(
        &self,
        file_name: &str,
        description: &str,
        rarity: Rarity,
        updated_by: &str,
        updated_on: DateTime<Utc>,
    ) -> Result<u64, GachaError> {
        let mut records = self.records.write().await;
        match records.rows.iter_mut().find(|row| row.file_name == file_name) {
            Some(row) => {
                row.description = description.to_string();
                row.rarity = rarity;
                row.updated_by = updated_by.to_string();
                row.updated_on = updated_on;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, image_id: i64) -> Result<u64, GachaError> {
        let mut records = self.records.write().await;
        let before = records.rows.len();
        records.rows.retain(|row| row.image_id != image_id);
        Ok((before - records.rows.len()) as u64)
    }
}
