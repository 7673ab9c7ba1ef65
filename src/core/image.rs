// Image catalog, gacha draws and the daily dollar

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use regex::RegexBuilder;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{ImageStore, UserAliasStore, UserImageStore};
use crate::core::errors::GachaError;
use crate::core::models::{
    Image, ImageBody, ImageQuery, ImageResponse, NewImage, NewUserImage, Rarity, UserAliasQuery,
    UserImage, UserImageFilter,
};

/// Storage folder every catalog image lives under
pub const IMAGE_PATH: &str = "images";

/// Hours between two daily-dollar draws
pub const DAILY_DOLLAR_INTERVAL_HOURS: i64 = 24;

/// `{rarity}_{words}.{ext}`, e.g. `1_couch_potato.jpeg`
const FILE_NAME_PATTERN: &str = r"^[1-5]_[a-z0-9_']+[.][a-z]{3,4}$";

/// Description and rarity carried by an image file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    pub description: String,
    pub rarity: Rarity,
}

pub struct ImageLogic {
    images: Arc<dyn ImageStore + Send + Sync>,
    user_images: Arc<dyn UserImageStore + Send + Sync>,
    user_aliases: Arc<dyn UserAliasStore + Send + Sync>,
}

impl ImageLogic {
    pub fn new(
        images: Arc<dyn ImageStore + Send + Sync>,
        user_images: Arc<dyn UserImageStore + Send + Sync>,
        user_aliases: Arc<dyn UserAliasStore + Send + Sync>,
    ) -> Self {
        Self {
            images,
            user_images,
            user_aliases,
        }
    }

    /// Add a catalog image. Returns the number of rows added.
    pub async fn create(
        &self,
        body: ImageBody,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, GachaError> {
        let file_name = required_file_name(body)?;
        let parsed = parse_file_name(&file_name)?;
        self.images
            .create(NewImage {
                path: IMAGE_PATH.to_string(),
                file_name,
                description: parsed.description,
                rarity: parsed.rarity,
                created_by: user_email.to_string(),
                created_on: now,
            })
            .await?;
        Ok(1)
    }

    /// Re-derive description and rarity of the image stored under the body's file name
    pub async fn update(
        &self,
        body: ImageBody,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, GachaError> {
        let file_name = required_file_name(body)?;
        let parsed = parse_file_name(&file_name)?;
        self.images
            .update(&file_name, &parsed.description, parsed.rarity, user_email, now)
            .await
    }

    /// Owned images, newest ownership first.
    ///
    /// `user_email` wins over `user_alias`; without either, every owned image is listed.
    pub async fn read(&self, query: &ImageQuery) -> Result<Vec<ImageResponse>, GachaError> {
        if query.limit == 0 {
            return Err(GachaError::RequiredValue(vec!["limit".to_string()]));
        }

        let owner = match (&query.user_email, &query.user_alias) {
            (Some(email), _) => Some(email.clone()),
            (None, Some(alias)) => {
                let by_alias = UserAliasQuery {
                    user_alias: Some(alias.clone()),
                    ..Default::default()
                };
                match self.user_aliases.read(&by_alias).await?.into_iter().next() {
                    Some(record) => Some(record.user_email),
                    None => return Ok(Vec::new()),
                }
            }
            (None, None) => None,
        };

        let filter = UserImageFilter {
            user_email: owner,
            opened: query.opened,
        };
        let owned = self.user_images.find(&filter).await?;
        let catalog: HashMap<i64, Image> = self
            .images
            .list()
            .await?
            .into_iter()
            .map(|image| (image.image_id, image))
            .collect();

        Ok(owned
            .iter()
            .filter_map(|row| catalog.get(&row.image_id))
            .skip(query.offset)
            .take(query.limit)
            .map(ImageResponse::from)
            .collect())
    }

    pub async fn delete(&self, image_id: i64) -> Result<u64, GachaError> {
        self.images.delete(image_id).await
    }

    /// Draw an image `user_email` does not own yet and add it, unopened, to
    /// their inventory.
    pub async fn gacha(&self, user_email: &str, now: DateTime<Utc>) -> Result<UserImage, GachaError> {
        let owned_by_user = UserImageFilter {
            user_email: Some(user_email.to_string()),
            opened: None,
        };
        let owned: HashSet<i64> = self
            .user_images
            .find(&owned_by_user)
            .await?
            .iter()
            .map(|row| row.image_id)
            .collect();
        let candidates: Vec<Image> = self
            .images
            .list()
            .await?
            .into_iter()
            .filter(|image| !owned.contains(&image.image_id))
            .collect();

        let image_id = draw(&candidates, &mut rand::thread_rng())
            .map(|image| image.image_id)
            .ok_or_else(|| GachaError::Conflict("You already own all images".to_string()))?;

        let user_image = self
            .user_images
            .create(NewUserImage {
                user_email: user_email.to_string(),
                image_id,
                opened: false,
                created_by: user_email.to_string(),
                created_on: now,
            })
            .await?;
        info!(principal = %user_email, image_id, candidates = candidates.len(), "Gacha draw");
        Ok(user_image)
    }

    /// Open the caller's oldest unopened image; empty when nothing is waiting
    pub async fn open_image(
        &self,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ImageResponse>, GachaError> {
        let Some(opened) = self.user_images.open_oldest(user_email, now).await? else {
            return Ok(Vec::new());
        };
        let image = self.images.get(opened.image_id).await?;
        Ok(image.iter().map(ImageResponse::from).collect())
    }

    /// Claim the free daily draw.
    ///
    /// Returns `false` while the last claim is younger than
    /// [`DAILY_DOLLAR_INTERVAL_HOURS`]. A claim is spent before the draw, so
    /// a failed draw does not hand the claim back.
    pub async fn daily_dollar(&self, user_email: &str, now: DateTime<Utc>) -> Result<bool, GachaError> {
        if self.user_aliases.find_by_email(user_email).await?.is_none() {
            return Err(GachaError::NotFound {
                resource_type: "user_alias".to_string(),
                id: user_email.to_string(),
            });
        }

        let claimable_before = now - Duration::hours(DAILY_DOLLAR_INTERVAL_HOURS);
        let claimed = self
            .user_aliases
            .claim_daily_dollar(user_email, now, claimable_before)
            .await?;
        if claimed == 0 {
            debug!(principal = %user_email, "Daily dollar already claimed");
            return Ok(false);
        }

        self.gacha(user_email, now).await?;
        Ok(true)
    }
}

fn required_file_name(body: ImageBody) -> Result<String, GachaError> {
    match body.file_name.map(|name| name.trim().to_string()) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(GachaError::RequiredValue(vec!["file_name".to_string()])),
    }
}

fn invalid_file_name() -> GachaError {
    GachaError::InvalidValue {
        field: "file_name".to_string(),
        reason: "Incorrect file name schema".to_string(),
    }
}

/// Split `{rarity}_{words}.{ext}` into its rarity and a space-separated description
pub fn parse_file_name(file_name: &str) -> Result<ParsedFileName, GachaError> {
    let pattern = RegexBuilder::new(FILE_NAME_PATTERN)
        .case_insensitive(true)
        .build()
        .map_err(|e| GachaError::ConfigurationError(format!("Invalid file name pattern: {}", e)))?;
    if !pattern.is_match(file_name) {
        return Err(invalid_file_name());
    }

    let rarity = file_name[..1]
        .parse::<u8>()
        .ok()
        .and_then(Rarity::from_id)
        .ok_or_else(invalid_file_name)?;
    let stem_end = file_name.rfind('.').unwrap_or(file_name.len());
    let description = file_name[2..stem_end].replace('_', " ").trim().to_string();
    Ok(ParsedFileName { description, rarity })
}

/// Weighted draw: every candidate gets priority `-ln(u) / rarity` for a
/// uniform `u` and the highest priority wins.
pub fn draw<'a, R: Rng>(candidates: &'a [Image], rng: &mut R) -> Option<&'a Image> {
    candidates
        .iter()
        .map(|image| {
            // 1 - [0, 1) keeps ln away from zero
            let u: f64 = 1.0 - rng.gen::<f64>();
            (-u.ln() / f64::from(image.rarity.id()), image)
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, image)| image)
}
