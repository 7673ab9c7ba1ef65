// Axum web server layer

use axum::{
    error_handling::HandleErrorLayer,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;

use crate::auth::auth_middleware::require_scopes;
use crate::auth::engine::AuthorizationEngine;
use crate::auth::scopes::{scope, CrudOperation, ResourceType};
use crate::core::errors::GachaError;
use crate::core::image::ImageLogic;
use crate::core::models::{
    Image, NewImage, NewUserAlias, NewUserImage, PageQuery, Rarity, UserAlias, UserAliasQuery,
    UserImage, UserImageChanges, UserImageFilter,
};
use crate::core::user_alias::UserAliasLogic;
use crate::core::user_image::UserImageLogic;

pub use crate::config::Config;

/// Application state containing all shared dependencies
///
/// Components are behind `Arc` and must be `Send + Sync`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuthorizationEngine>,
    pub user_aliases: Arc<UserAliasLogic>,
    pub images: Arc<ImageLogic>,
    pub user_images: Arc<UserImageLogic>,
    pub config: Arc<Config>,
}

/// Persistence seam for user aliases
#[async_trait::async_trait]
pub trait UserAliasStore: Send + Sync {
    /// Insert a new alias. Fails with `Conflict` if the alias is taken
    /// (case-insensitive) or the email already has one.
    async fn create(&self, record: NewUserAlias) -> Result<UserAlias, GachaError>;

    async fn read(&self, query: &UserAliasQuery) -> Result<Vec<UserAlias>, GachaError>;

    async fn find_by_email(&self, user_email: &str) -> Result<Option<UserAlias>, GachaError>;

    /// Rename the alias owned by `user_email`. Returns the number of rows changed.
    async fn update_alias(
        &self,
        user_email: &str,
        user_alias: &str,
        updated_by: &str,
        updated_on: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, GachaError>;

    /// Move the daily-dollar timestamp of `user_email` to `now` if it is not
    /// later than `claimable_before`. Returns the number of rows changed.
    async fn claim_daily_dollar(
        &self,
        user_email: &str,
        now: chrono::DateTime<chrono::Utc>,
        claimable_before: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, GachaError>;

    async fn delete(&self, user_alias_id: i64) -> Result<u64, GachaError>;
}

/// Persistence seam for the image catalog
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Insert a new image. Fails with `Conflict` if the file name is taken.
    async fn create(&self, record: NewImage) -> Result<Image, GachaError>;

    async fn get(&self, image_id: i64) -> Result<Option<Image>, GachaError>;

    /// Every catalog image in id order
    async fn list(&self) -> Result<Vec<Image>, GachaError>;

    /// Replace description and rarity of the image stored as `file_name`
    async fn update(
        &self,
        file_name: &str,
        description: &str,
        rarity: Rarity,
        updated_by: &str,
        updated_on: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, GachaError>;

    async fn delete(&self, image_id: i64) -> Result<u64, GachaError>;
}

/// Persistence seam for user-owned images
#[async_trait::async_trait]
pub trait UserImageStore: Send + Sync {
    /// Record ownership. Fails with `Conflict` if the user already owns the image.
    async fn create(&self, record: NewUserImage) -> Result<UserImage, GachaError>;

    async fn read(&self, page: &PageQuery) -> Result<Vec<UserImage>, GachaError>;

    /// Matching rows, newest first
    async fn find(&self, filter: &UserImageFilter) -> Result<Vec<UserImage>, GachaError>;

    /// Mark the oldest unopened image of `user_email` as opened and return it
    async fn open_oldest(
        &self,
        user_email: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<UserImage>, GachaError>;

    async fn update(&self, user_image_id: i64, changes: UserImageChanges) -> Result<u64, GachaError>;

    async fn delete(&self, user_image_id: i64) -> Result<u64, GachaError>;
}

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - Request timeout (tower::timeout) - 408 when exceeded
/// - Body size limit (tower-http::limit)
/// - Tracing (tower-http::trace)
/// - Scope guard - per route, see [`require_scopes`]
///
/// `/healthcheck` is public.
pub fn create_router(app_state: &AppState) -> Router<AppState> {
    let engine = &app_state.engine;
    let update_scope = scope(CrudOperation::Update, ResourceType::UserAlias);
    let delete_scope = scope(CrudOperation::Delete, ResourceType::UserAlias);
    let create_image = scope(CrudOperation::Create, ResourceType::Image);
    let update_image = scope(CrudOperation::Update, ResourceType::Image);
    let delete_image = scope(CrudOperation::Delete, ResourceType::Image);
    let create_user_image = scope(CrudOperation::Create, ResourceType::UserImage);
    let update_user_image = scope(CrudOperation::Update, ResourceType::UserImage);
    let delete_user_image = scope(CrudOperation::Delete, ResourceType::UserImage);

    let router = Router::new()
        .route("/healthcheck", get(handlers::healthcheck_handler))
        .route(
            "/v1/user_alias",
            require_scopes(post(handlers::create_user_alias_handler), engine.clone(), &[]),
        )
        .route(
            "/v1/user_alias",
            require_scopes(get(handlers::read_user_alias_handler), engine.clone(), &[]),
        )
        .route(
            "/v1/user_alias/:user_alias_id",
            require_scopes(
                put(handlers::update_user_alias_handler),
                engine.clone(),
                &[update_scope.as_str()],
            ),
        )
        .route(
            "/v1/user_alias/:user_alias_id",
            require_scopes(
                delete(handlers::delete_user_alias_handler),
                engine.clone(),
                &[delete_scope.as_str()],
            ),
        )
        .route(
            "/v1/image",
            require_scopes(
                post(handlers::create_image_handler),
                engine.clone(),
                &[create_image.as_str()],
            ),
        )
        .route(
            "/v1/image",
            require_scopes(get(handlers::read_image_handler), engine.clone(), &[]),
        )
        .route(
            "/v1/image",
            require_scopes(
                put(handlers::update_image_handler),
                engine.clone(),
                &[update_image.as_str()],
            ),
        )
        .route(
            "/v1/image/open",
            require_scopes(put(handlers::open_image_handler), engine.clone(), &[]),
        )
        .route(
            "/v1/image/dd",
            require_scopes(post(handlers::daily_dollar_handler), engine.clone(), &[]),
        )
        .route(
            "/v1/image/:image_id",
            require_scopes(
                delete(handlers::delete_image_handler),
                engine.clone(),
                &[delete_image.as_str()],
            ),
        )
        .route(
            "/v1/user_image",
            require_scopes(
                post(handlers::create_user_image_handler),
                engine.clone(),
                &[create_user_image.as_str()],
            ),
        )
        .route(
            "/v1/user_image",
            require_scopes(get(handlers::read_user_image_handler), engine.clone(), &[]),
        )
        .route(
            "/v1/user_image/:user_image_id",
            require_scopes(
                put(handlers::update_user_image_handler),
                engine.clone(),
                &[update_user_image.as_str()],
            ),
        )
        .route(
            "/v1/user_image/:user_image_id",
            require_scopes(
                delete(handlers::delete_user_image_handler),
                engine.clone(),
                &[delete_user_image.as_str()],
            ),
        );

    // Layers wrap in reverse order: the last one added is outermost.
    let timeout_secs = app_state.config.request_timeout_secs;
    let timeout_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(middleware::handle_timeout_error))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    router
        .layer(middleware::tracing_layer())
        .layer(middleware::body_size_limit_layer(app_state.config.body_size_limit_bytes))
        .layer(timeout_stack)
}
