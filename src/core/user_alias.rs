// User alias business rules

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::api::UserAliasStore;
use crate::core::errors::GachaError;
use crate::core::models::{NewUserAlias, UserAlias, UserAliasBody, UserAliasQuery};

/// Days an alias must stay unchanged before it can be renamed
pub const ALIAS_RENAME_COOLDOWN_DAYS: i64 = 90;

/// New aliases get a daily-dollar timestamp this far in the past so the first
/// claim is available immediately.
pub const DAILY_DOLLAR_BACKDATE_DAYS: i64 = 2;

pub struct UserAliasLogic {
    store: Arc<dyn UserAliasStore + Send + Sync>,
}

impl UserAliasLogic {
    pub fn new(store: Arc<dyn UserAliasStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Create the caller's alias. Returns the number of rows added.
    pub async fn create(
        &self,
        body: UserAliasBody,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, GachaError> {
        let alias = required_alias(body)?;
        let record = NewUserAlias {
            user_email: user_email.to_string(),
            user_alias: alias,
            daily_dollar: now - Duration::days(DAILY_DOLLAR_BACKDATE_DAYS),
            created_by: user_email.to_string(),
            updated_by: user_email.to_string(),
            created_on: now,
        };
        self.store.create(record).await?;
        Ok(1)
    }

    pub async fn read(&self, query: &UserAliasQuery) -> Result<Vec<UserAlias>, GachaError> {
        if query.limit == 0 {
            return Err(GachaError::RequiredValue(vec!["limit".to_string()]));
        }
        self.store.read(query).await
    }

    /// Rename the caller's alias, honoring the rename cooldown.
    ///
    /// Returns 0 without touching the record while the cooldown is running.
    pub async fn update(
        &self,
        user_alias_id: i64,
        body: UserAliasBody,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, GachaError> {
        let alias = required_alias(body)?;
        let current = self
            .store
            .find_by_email(user_email)
            .await?
            .filter(|record| record.user_alias_id == user_alias_id)
            .ok_or_else(|| GachaError::NotFound {
                resource_type: "user_alias".to_string(),
                id: user_alias_id.to_string(),
            })?;

        if current.updated_on >= now - Duration::days(ALIAS_RENAME_COOLDOWN_DAYS) {
            return Ok(0);
        }
        self.store
            .update_alias(user_email, &alias, user_email, now)
            .await
    }

    pub async fn delete(&self, user_alias_id: i64) -> Result<u64, GachaError> {
        self.store.delete(user_alias_id).await
    }
}

fn required_alias(body: UserAliasBody) -> Result<String, GachaError> {
    match body.user_alias.map(|alias| alias.trim().to_string()) {
        Some(alias) if !alias.is_empty() => Ok(alias),
        _ => Err(GachaError::RequiredValue(vec!["user_alias".to_string()])),
    }
}
