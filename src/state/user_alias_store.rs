// In-memory user alias store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::api::UserAliasStore;
use crate::core::errors::GachaError;
use crate::core::models::{NewUserAlias, UserAlias, UserAliasQuery};

#[derive(Debug, Default)]
struct Records {
    next_id: i64,
    rows: Vec<UserAlias>,
}

/// Process-local [`UserAliasStore`]; rows are kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryUserAliasStore {
    records: RwLock<Records>,
}

impl InMemoryUserAliasStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserAliasStore for InMemoryUserAliasStore {
    async fn create(&self, record: NewUserAlias) -> Result<UserAlias, GachaError> {
        let mut records = self.records.write().await;
        if records.rows.iter().any(|row| row.user_email == record.user_email) {
            return Err(GachaError::Conflict(format!(
                "{} already has an alias",
                record.user_email
            )));
        }
        if records
            .rows
            .iter()
            .any(|row| row.user_alias.eq_ignore_ascii_case(&record.user_alias))
        {
            return Err(GachaError::Conflict(format!(
                "Alias {} is already taken",
                record.user_alias
            )));
        }

        records.next_id += 1;
        let row = UserAlias {
            user_alias_id: records.next_id,
            user_email: record.user_email,
            user_alias: record.user_alias,
            daily_dollar: record.daily_dollar,
            created_by: record.created_by,
            created_on: record.created_on,
            updated_by: record.updated_by,
            updated_on: record.created_on,
        };
        records.rows.push(row.clone());
        Ok(row)
    }

    async fn read(&self, query: &UserAliasQuery) -> Result<Vec<UserAlias>, GachaError> {
        let records = self.records.read().await;
        let rows = records
            .rows
            .iter()
            .filter(|row| match (&query.user_email, &query.user_alias) {
                (Some(email), _) => &row.user_email == email,
                (None, Some(alias)) => row.user_alias.eq_ignore_ascii_case(alias),
                (None, None) => true,
            })
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn find_by_email(&self, user_email: &str) -> Result<Option<UserAlias>, GachaError> {
        let records = self.records.read().await;
        Ok(records
            .rows
            .iter()
            .find(|row| row.user_email == user_email)
            .cloned())
    }

    async fn update_alias(
        &self,
        user_email: &str,
        user_alias: &str,
        updated_by: &str,
        updated_on: DateTime<Utc>,
    ) -> Result<u64, GachaError> {
        let mut records = self.records.write().await;
        if records.rows.iter().any(|row| {
            row.user_email != user_email && row.user_alias.eq_ignore_ascii_case(user_alias)
        }) {
            return Err(GachaError::Conflict(format!(
                "Alias {} is already taken",
                user_alias
            )));
        }
        match records.rows.iter_mut().find(|row| row.user_email == user_email) {
            Some(row) => {
                row.user_alias = user_alias.to_string();
                row.updated_by = updated_by.to_string();
                row.updated_on = updated_on;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn claim_daily_dollar(
        &self,
        user_email: &str,
        now: DateTime<Utc>,
        claimable_before: DateTime<Utc>,
    ) -> Result<u64, GachaError> {
        let mut records = self.records.write().await;
        match records
            .rows
            .iter_mut()
            .find(|row| row.user_email == user_email && row.daily_dollar <= claimable_before)
        {
            Some(row) => {
                row.daily_dollar = now;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, user_alias_id: i64) -> Result<u64, GachaError> {
        let mut records = self.records.write().await;
        let before = records.rows.len();
        records.rows.retain(|row| row.user_alias_id != user_alias_id);
        Ok((before - records.rows.len()) as u64)
    }
}
