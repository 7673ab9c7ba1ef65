// Domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated identity acting on a request.
///
/// Built fresh for every request from verified token claims and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Email-like identifier taken from the namespaced `email` claim
    pub id: String,
    /// Tenant the principal belongs to
    pub tenant: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant: tenant.into(),
        }
    }
}

/// Stored alias record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAlias {
    pub user_alias_id: i64,
    pub user_email: String,
    pub user_alias: String,
    pub daily_dollar: DateTime<Utc>,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
    pub updated_by: String,
    pub updated_on: DateTime<Utc>,
}

/// Request body for alias create/update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAliasBody {
    #[serde(default)]
    pub user_alias: Option<String>,
}

/// New alias ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserAlias {
    pub user_email: String,
    pub user_alias: String,
    pub daily_dollar: DateTime<Utc>,
    pub created_by: String,
    pub updated_by: String,
    pub created_on: DateTime<Utc>,
}

/// Filter for alias listing
#[derive(Debug, Clone, Deserialize)]
pub struct UserAliasQuery {
    #[serde(default)]
    pub user_alias: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    1
}

impl Default for UserAliasQuery {
    fn default() -> Self {
        Self {
            user_alias: None,
            user_email: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddResponse {
    pub added: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateResponse {
    pub updated: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResponse {
    pub deleted: u64,
}

/// Image rarity tiers; the id is also the draw weight divisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common = 1,
    Uncommon = 2,
    Rare = 3,
    Epic = 4,
    Unique = 5,
}

impl Rarity {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Rarity::Common),
            2 => Some(Rarity::Uncommon),
            3 => Some(Rarity::Rare),
            4 => Some(Rarity::Epic),
            5 => Some(Rarity::Unique),
            _ => None,
        }
    }

    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Unique => "unique",
        }
    }
}

/// Catalog image record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub image_id: i64,
    pub path: String,
    pub file_name: String,
    pub description: String,
    pub rarity: Rarity,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
    pub updated_by: String,
    pub updated_on: DateTime<Utc>,
}

/// Request body for image create/update; everything else is derived from the file name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageBody {
    #[serde(default)]
    pub file_name: Option<String>,
}

/// New image ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub path: String,
    pub file_name: String,
    pub description: String,
    pub rarity: Rarity,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
}

/// Filter for the owned-image listing
#[derive(Debug, Clone, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_alias: Option<String>,
    #[serde(default)]
    pub opened: Option<bool>,
    #[serde(default = "default_page_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for ImageQuery {
    fn default() -> Self {
        Self {
            user_email: None,
            user_alias: None,
            opened: None,
            limit: default_page_limit(),
            offset: 0,
        }
    }
}

/// Image as shown to players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResponse {
    pub path: String,
    pub file_name: String,
    pub description: String,
    pub rarity_name: String,
}

impl From<&Image> for ImageResponse {
    fn from(image: &Image) -> Self {
        Self {
            path: image.path.clone(),
            file_name: image.file_name.clone(),
            description: image.description.clone(),
            rarity_name: image.rarity.name().to_string(),
        }
    }
}

/// Ownership of one image by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserImage {
    pub user_image_id: i64,
    pub user_email: String,
    pub image_id: i64,
    pub opened: bool,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
    pub updated_by: String,
    pub updated_on: DateTime<Utc>,
}

/// Request body for user image create/update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserImageBody {
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub image_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserImage {
    pub user_email: String,
    pub image_id: i64,
    pub opened: bool,
    pub created_by: String,
    pub created_on: DateTime<Utc>,
}

/// Fields replaced by a user image update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserImageChanges {
    pub user_email: Option<String>,
    pub image_id: i64,
    pub updated_by: String,
    pub updated_on: DateTime<Utc>,
}

/// Store-level selection of user images, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserImageFilter {
    pub user_email: Option<String>,
    pub opened: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: default_page_limit(),
            offset: 0,
        }
    }
}

fn default_page_limit() -> usize {
    50
}
