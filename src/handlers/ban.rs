use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{BanDuration, ForumBanModel};
use crate::response::ApiResponse;
use crate::services::ban::BanService;
use axum::{extract::Path, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BanUserRequest {
    pub user_id: i32,
    /// At least 10 characters once trimmed
    #[validate(length(min = 10, max = 1000))]
    pub reason: String,
    /// One of `1d`, `7d`, `30d`, `permanent`
    pub duration: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BanResponse {
    pub id: i32,
    pub forum_id: i32,
    pub user_id: i32,
    pub reason: String,
    pub duration: String,
    pub banned_at: String,
    pub banned_by: i32,
    pub is_active: bool,
    /// When a timed ban lapses; informational only
    pub expires_at: Option<String>,
}

impl From<ForumBanModel> for BanResponse {
    fn from(b: ForumBanModel) -> Self {
        Self {
            id: b.id,
            forum_id: b.forum_id,
            user_id: b.user_id,
            reason: b.reason,
            duration: b.duration.as_str().to_string(),
            banned_at: b.banned_at.to_string(),
            banned_by: b.banned_by,
            is_active: b.is_active,
            expires_at: b.duration.expires_at(b.banned_at).map(|t| t.to_string()),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{id}/bans",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Ban history, oldest first", body = Vec<BanResponse>),
        (status = 403, description = "Moderators only", body = AppError),
    ),
    tag = "bans"
)]
pub async fn list_bans(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let bans = BanService::new(db).list_bans(id, auth_user.user_id).await?;
    let items: Vec<BanResponse> = bans.into_iter().map(BanResponse::from).collect();
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/bans",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    request_body = BanUserRequest,
    responses(
        (status = 200, description = "User banned", body = BanResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Not allowed to ban this user", body = AppError),
    ),
    tag = "bans"
)]
pub async fn ban_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<BanUserRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let duration: BanDuration = payload.duration.parse().map_err(AppError::Validation)?;

    let ban = BanService::new(db)
        .ban(id, auth_user.user_id, payload.user_id, &payload.reason, duration)
        .await?;
    Ok(ApiResponse::ok(BanResponse::from(ban)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/forums/{id}/bans/{user_id}",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Forum ID"),
        ("user_id" = i32, Path, description = "Banned user ID"),
    ),
    responses(
        (status = 200, description = "Ban lifted", body = String),
        (status = 403, description = "Moderators only", body = AppError),
        (status = 404, description = "No active ban", body = AppError),
    ),
    tag = "bans"
)]
pub async fn unban_user(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<impl IntoResponse> {
    BanService::new(db)
        .unban(id, auth_user.user_id, user_id)
        .await?;
    Ok(ApiResponse::ok("Ban lifted"))
}
