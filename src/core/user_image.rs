// User image inventory rules

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::api::{ImageStore, UserImageStore};
use crate::core::errors::GachaError;
use crate::core::models::{NewUserImage, PageQuery, UserImage, UserImageBody, UserImageChanges};

pub struct UserImageLogic {
    user_images: Arc<dyn UserImageStore + Send + Sync>,
    images: Arc<dyn ImageStore + Send + Sync>,
}

impl UserImageLogic {
    pub fn new(
        user_images: Arc<dyn UserImageStore + Send + Sync>,
        images: Arc<dyn ImageStore + Send + Sync>,
    ) -> Self {
        Self { user_images, images }
    }

    /// Grant an image. The owner defaults to the caller when the body names none.
    pub async fn create(
        &self,
        body: UserImageBody,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, GachaError> {
        let image_id = self.existing_image(&body).await?;
        let owner = body.user_email.unwrap_or_else(|| user_email.to_string());
        self.user_images
            .create(NewUserImage {
                user_email: owner,
                image_id,
                opened: false,
                created_by: user_email.to_string(),
                created_on: now,
            })
            .await?;
        Ok(1)
    }

    pub async fn read(&self, page: &PageQuery) -> Result<Vec<UserImage>, GachaError> {
        if page.limit == 0 {
            return Err(GachaError::RequiredValue(vec!["limit".to_string()]));
        }
        self.user_images.read(page).await
    }

    pub async fn update(
        &self,
        user_image_id: i64,
        body: UserImageBody,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, GachaError> {
        let image_id = self.existing_image(&body).await?;
        let changes = UserImageChanges {
            user_email: body.user_email,
            image_id,
            updated_by: user_email.to_string(),
            updated_on: now,
        };
        self.user_images.update(user_image_id, changes).await
    }

    pub async fn delete(&self, user_image_id: i64) -> Result<u64, GachaError> {
        self.user_images.delete(user_image_id).await
    }

    async fn existing_image(&self, body: &UserImageBody) -> Result<i64, GachaError> {
        let image_id = body
            .image_id
            .ok_or_else(|| GachaError::RequiredValue(vec!["image_id".to_string()]))?;
        match self.images.get(image_id).await? {
            Some(_) => Ok(image_id),
            None => Err(GachaError::NotFound {
                resource_type: "image".to_string(),
                id: image_id.to_string(),
            }),
        }
    }
}
