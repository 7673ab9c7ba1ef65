// Request handlers for API endpoints

use axum::{extract::State, response::Json, Extension};
use chrono::Utc;
use tracing::info;

use crate::api::extractors::{ApiJson, ApiPath, ApiQuery};
use crate::api::responses::{ApiError, HealthResponse};
use crate::api::AppState;
use crate::core::models::{
    AddResponse, DeleteResponse, ImageBody, ImageQuery, ImageResponse, PageQuery, Principal,
    UpdateResponse, UserAlias, UserAliasBody, UserAliasQuery, UserImage, UserImageBody,
};

/// GET /healthcheck
pub async fn healthcheck_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /v1/user_alias
///
/// Creates the caller's alias; one alias per email.
pub async fn create_user_alias_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<UserAliasBody>,
) -> Result<Json<AddResponse>, ApiError> {
    let added = app_state
        .user_aliases
        .create(body, &principal.id, Utc::now())
        .await?;
    info!(principal = %principal.id, "User alias created");
    Ok(Json(AddResponse { added }))
}

/// GET /v1/user_alias
pub async fn read_user_alias_handler(
    State(app_state): State<AppState>,
    ApiQuery(query): ApiQuery<UserAliasQuery>,
) -> Result<Json<Vec<UserAlias>>, ApiError> {
    let records = app_state.user_aliases.read(&query).await?;
    Ok(Json(records))
}

/// PUT /v1/user_alias/:user_alias_id
///
/// Renames the caller's alias. `updated` is 0 while the rename cooldown runs.
pub async fn update_user_alias_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(user_alias_id): ApiPath<i64>,
    ApiJson(body): ApiJson<UserAliasBody>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let updated = app_state
        .user_aliases
        .update(user_alias_id, body, &principal.id, Utc::now())
        .await?;
    info!(principal = %principal.id, user_alias_id, updated, "User alias update");
    Ok(Json(UpdateResponse { updated }))
}

/// DELETE /v1/user_alias/:user_alias_id
pub async fn delete_user_alias_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(user_alias_id): ApiPath<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = app_state.user_aliases.delete(user_alias_id).await?;
    info!(principal = %principal.id, user_alias_id, deleted, "User alias delete");
    Ok(Json(DeleteResponse { deleted }))
}

/// POST /v1/image
pub async fn create_image_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<ImageBody>,
) -> Result<Json<AddResponse>, ApiError> {
    let added = app_state.images.create(body, &principal.id, Utc::now()).await?;
    info!(principal = %principal.id, "Image created");
    Ok(Json(AddResponse { added }))
}

/// GET /v1/image
pub async fn read_image_handler(
    State(app_state): State<AppState>,
    ApiQuery(query): ApiQuery<ImageQuery>,
) -> Result<Json<Vec<ImageResponse>>, ApiError> {
    Ok(Json(app_state.images.read(&query).await?))
}

/// PUT /v1/image
pub async fn update_image_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<ImageBody>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let updated = app_state.images.update(body, &principal.id, Utc::now()).await?;
    info!(principal = %principal.id, updated, "Image update");
    Ok(Json(UpdateResponse { updated }))
}

/// DELETE /v1/image/:image_id
pub async fn delete_image_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(image_id): ApiPath<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = app_state.images.delete(image_id).await?;
    info!(principal = %principal.id, image_id, deleted, "Image delete");
    Ok(Json(DeleteResponse { deleted }))
}

/// PUT /v1/image/open
///
/// Reveals the caller's oldest unopened image, or `[]`.
pub async fn open_image_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<ImageResponse>>, ApiError> {
    Ok(Json(app_state.images.open_image(&principal.id, Utc::now()).await?))
}

/// POST /v1/image/dd
///
/// `true` when the daily draw was granted.
pub async fn daily_dollar_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<bool>, ApiError> {
    let granted = app_state.images.daily_dollar(&principal.id, Utc::now()).await?;
    info!(principal = %principal.id, granted, "Daily dollar");
    Ok(Json(granted))
}

/// POST /v1/user_image
pub async fn create_user_image_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<UserImageBody>,
) -> Result<Json<AddResponse>, ApiError> {
    let added = app_state.user_images.create(body, &principal.id, Utc::now()).await?;
    info!(principal = %principal.id, "User image created");
    Ok(Json(AddResponse { added }))
}

/// GET /v1/user_image
pub async fn read_user_image_handler(
    State(app_state): State<AppState>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Json<Vec<UserImage>>, ApiError> {
    Ok(Json(app_state.user_images.read(&page).await?))
}

/// PUT /v1/user_image/:user_image_id
pub async fn update_user_image_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(user_image_id): ApiPath<i64>,
    ApiJson(body): ApiJson<UserImageBody>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let updated = app_state
        .user_images
        .update(user_image_id, body, &principal.id, Utc::now())
        .await?;
    info!(principal = %principal.id, user_image_id, updated, "User image update");
    Ok(Json(UpdateResponse { updated }))
}

/// DELETE /v1/user_image/:user_image_id
pub async fn delete_user_image_handler(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(user_image_id): ApiPath<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = app_state.user_images.delete(user_image_id).await?;
    info!(principal = %principal.id, user_image_id, deleted, "User image delete");
    Ok(Json(DeleteResponse { deleted }))
}
