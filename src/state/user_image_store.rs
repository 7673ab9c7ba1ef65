// In-memory user image inventory

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::api::UserImageStore;
use crate::core::errors::GachaError;
use crate::core::models::{NewUserImage, PageQuery, UserImage, UserImageChanges, UserImageFilter};

#[derive(Debug, Default)]
struct Records {
    next_id: i64,
    rows: Vec<UserImage>,
}

/// Process-local [`UserImageStore`]. Rows are kept in insertion order, so a
/// reverse scan is newest first.
#[derive(Debug, Default)]
pub struct InMemoryUserImageStore {
    records: RwLock<Records>,
}

impl InMemoryUserImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(row: &UserImage, filter: &UserImageFilter) -> bool {
    filter.user_email.as_ref().map_or(true, |email| &row.user_email == email)
        && filter.opened.map_or(true, |opened| row.opened == opened)
}

#[async_trait]
impl UserImageStore for InMemoryUserImageStore {
    async fn create(&self, record: NewUserImage) -> Result<UserImage, GachaError> {
        let mut records = self.records.write().await;
        if records
            .rows
            .iter()
            .any(|row| row.user_email == record.user_email && row.image_id == record.image_id)
        {
            return Err(GachaError::Conflict(format!(
                "{} already owns image {}",
                record.user_email, record.image_id
            )));
        }

        records.next_id += 1;
        let row = UserImage {
            user_image_id: records.next_id,
            user_email: record.user_email,
            image_id: record.image_id,
            opened: record.opened,
            created_by: record.created_by.clone(),
            created_on: record.created_on,
            updated_by: record.created_by,
            updated_on: record.created_on,
        };
        records.rows.push(row.clone());
        Ok(row)
    }

    async fn read(&self, page: &PageQuery) -> Result<Vec<UserImage>, GachaError> {
        let records = self.records.read().await;
        Ok(records
            .rows
            .iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn find(&self, filter: &UserImageFilter) -> Result<Vec<UserImage>, GachaError> {
        let records = self.records.read().await;
        Ok(records
            .rows
            .iter()
            .rev()
            .filter(|row| matches(row, filter))
            .cloned()
            .collect())
    }

    async fn open_oldest(
        &self,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserImage>, GachaError> {
        let mut records = self.records.write().await;
        let oldest = records
            .rows
            .iter_mut()
            .filter(|row| row.user_email == user_email && !row.opened)
            .min_by_key(|row| (row.created_on, row.user_image_id));
        Ok(oldest.map(|row| {
            row.opened = true;
            row.updated_by = user_email.to_string();
            row.updated_on = now;
            row.clone()
        }))
    }

    async fn update(&self, user_image_id: i64, changes: UserImageChanges) -> Result<u64, GachaError> {
        let mut records = self.records.write().await;
        let owner = match records.rows.iter().find(|row| row.user_image_id == user_image_id) {
            Some(row) => changes.user_email.clone().unwrap_or_else(|| row.user_email.clone()),
            None => return Ok(0),
        };
        if records.rows.iter().any(|row| {
            row.user_image_id != user_image_id
                && row.user_email == owner
                && row.image_id == changes.image_id
        }) {
            return Err(GachaError::Conflict(format!(
                "{} already owns image {}",
                owner, changes.image_id
            )));
        }

        match records.rows.iter_mut().find(|row| row.user_image_id == user_image_id) {
            Some(row) => {
                row.user_email = owner;
                row.image_id = changes.image_id;
                row.updated_by = changes.updated_by;
                row.updated_on = changes.updated_on;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, user_image_id: i64) -> Result<u64, GachaError> {
        let mut records = self.records.write().await;
        let before = records.rows.len();
        records.rows.retain(|row| row.user_image_id != user_image_id);
        Ok((before - records.rows.len()) as u64)
    }
}
