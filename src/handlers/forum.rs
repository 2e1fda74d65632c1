use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::ForumModel;
use crate::response::ApiResponse;
use crate::services::community::{CascadeReport, CommunityService};
use crate::services::forum::{ForumService, ForumSettings, NewForum};
use axum::{extract::Path, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateForumRequest {
    /// Forum name (1-100 characters)
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Forum description (max 500 characters)
    #[validate(length(max = 500))]
    pub description: String,
    #[validate(length(max = 5000))]
    pub rules: Option<String>,
    /// Queue join requests for moderator approval
    #[serde(default)]
    pub requires_approval: bool,
    /// Hold posts by plain members until a moderator validates them
    #[serde(default)]
    pub requires_post_approval: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateForumSettingsRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 5000))]
    pub rules: Option<String>,
    pub requires_approval: Option<bool>,
    pub requires_post_approval: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub rules: Option<String>,
    pub owner_id: i32,
    pub requires_approval: bool,
    pub requires_post_approval: bool,
    pub member_count: i32,
    pub post_count: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ForumModel> for ForumResponse {
    fn from(f: ForumModel) -> Self {
        Self {
            id: f.id,
            name: f.name,
            description: f.description,
            rules: f.rules,
            owner_id: f.owner_id,
            requires_approval: f.requires_approval,
            requires_post_approval: f.requires_post_approval,
            member_count: f.member_count,
            post_count: f.post_count,
            created_at: f.created_at.to_string(),
            updated_at: f.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ForumSettingsResponse {
    pub forum: ForumResponse,
    /// Pending posts published because post approval was turned off
    pub validated_posts: usize,
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{id}",
    params(("id" = i32, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Forum details", body = ForumResponse),
        (status = 404, description = "Forum not found", body = AppError),
    ),
    tag = "forums"
)]
pub async fn get_forum(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let forum = ForumService::new(db).get_by_id(id).await?;
    Ok(ApiResponse::ok(ForumResponse::from(forum)))
}

#[utoipa::path(
    post,
    path = "/api/v1/forums",
    security(("jwt_token" = [])),
    request_body = CreateForumRequest,
    responses(
        (status = 200, description = "Forum created", body = ForumResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Doctors and admins only", body = AppError),
    ),
    tag = "forums"
)]
pub async fn create_forum(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreateForumRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let forum = ForumService::new(db)
        .create(
            auth_user.user_id,
            NewForum {
                name: payload.name,
                description: payload.description,
                rules: payload.rules,
                requires_approval: payload.requires_approval,
                requires_post_approval: payload.requires_post_approval,
            },
        )
        .await?;

    Ok(ApiResponse::ok(ForumResponse::from(forum)))
}

#[utoipa::path(
    put,
    path = "/api/v1/forums/{id}/settings",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    request_body = UpdateForumSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = ForumSettingsResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Owner or admin only", body = AppError),
    ),
    tag = "forums"
)]
pub async fn update_forum_settings(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateForumSettingsRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let update = ForumService::new(db)
        .update_settings(
            id,
            auth_user.user_id,
            ForumSettings {
                name: payload.name,
                description: payload.description,
                rules: payload.rules,
                requires_approval: payload.requires_approval,
                requires_post_approval: payload.requires_post_approval,
            },
        )
        .await?;

    Ok(ApiResponse::ok(ForumSettingsResponse {
        forum: ForumResponse::from(update.forum),
        validated_posts: update.validated_posts,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/forums/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Forum and its content deleted", body = CascadeReport),
        (status = 403, description = "Owner or admin only", body = AppError),
    ),
    tag = "forums"
)]
pub async fn delete_forum(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let report = CommunityService::new(db)
        .delete_community(id, auth_user.user_id)
        .await?;
    Ok(ApiResponse::ok(report))
}
