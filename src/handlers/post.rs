use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{DeletedPostModel, PostModel, ReactionKind};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::post::{NewPost, PostRemoval, PostService, ReactionSummary};
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1, max = 40000))]
    pub content: String,
    /// Already-uploaded image
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectPostRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReactRequest {
    /// `like` or `dislike`; repeating the same kind clears it
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct DeletePostQuery {
    pub reason: Option<String>,
    /// Delete under moderator authority instead of as the author
    #[serde(default)]
    pub moderator: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i32,
    pub forum_id: i32,
    pub author_id: i32,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: String,
    pub comment_count: i32,
    pub view_count: i32,
    pub validated_at: Option<String>,
    pub validated_by: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PostModel> for PostResponse {
    fn from(p: PostModel) -> Self {
        Self {
            id: p.id,
            forum_id: p.forum_id,
            author_id: p.author_id,
            title: p.title,
            content: p.content,
            image_url: p.image_url,
            status: p.status.as_str().to_string(),
            comment_count: p.comment_count,
            view_count: p.view_count,
            validated_at: p.validated_at.map(|t| t.to_string()),
            validated_by: p.validated_by,
            created_at: p.created_at.to_string(),
            updated_at: p.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedPostResponse {
    pub id: i32,
    pub forum_id: i32,
    pub author_id: i32,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: String,
    pub validated_at: Option<String>,
    pub validated_by: Option<i32>,
    pub deleted_at: String,
    pub deleted_by: i32,
    pub delete_reason: String,
    pub delete_type: String,
    pub likes_at_deletion: i32,
    pub dislikes_at_deletion: i32,
    pub comment_count_at_deletion: i32,
    pub view_count_at_deletion: i32,
}

impl From<DeletedPostModel> for DeletedPostResponse {
    fn from(d: DeletedPostModel) -> Self {
        let delete_type = match d.delete_type {
            crate::models::DeleteType::ModeratorRejection => "moderator_rejection",
            crate::models::DeleteType::ModeratorDeletion => "moderator_deletion",
        };
        Self {
            id: d.id,
            forum_id: d.forum_id,
            author_id: d.author_id,
            title: d.title,
            content: d.content,
            image_url: d.image_url,
            status: d.status.as_str().to_string(),
            created_at: d.created_at.to_string(),
            validated_at: d.validated_at.map(|t| t.to_string()),
            validated_by: d.validated_by,
            deleted_at: d.deleted_at.to_string(),
            deleted_by: d.deleted_by,
            delete_reason: d.delete_reason,
            delete_type: delete_type.to_string(),
            likes_at_deletion: d.likes_at_deletion,
            dislikes_at_deletion: d.dislikes_at_deletion,
            comment_count_at_deletion: d.comment_count_at_deletion,
            view_count_at_deletion: d.view_count_at_deletion,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{id}/posts",
    params(
        ("id" = i32, Path, description = "Forum ID"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
    ),
    responses(
        (status = 200, description = "Active posts, newest first", body = PaginatedResponse<PostResponse>),
        (status = 404, description = "Forum not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn list_posts(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(params): Query<PaginationQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, per_page) = params.resolve();
    let (posts, total) = PostService::new(db)
        .list_by_forum(id, page, per_page)
        .await?;
    let items: Vec<PostResponse> = posts.into_iter().map(PostResponse::from).collect();
    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{id}/posts/pending",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Posts awaiting validation, oldest first", body = Vec<PostResponse>),
        (status = 403, description = "Moderators only", body = AppError),
    ),
    tag = "posts"
)]
pub async fn list_pending_posts(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let posts = PostService::new(db)
        .list_pending(id, auth_user.user_id)
        .await?;
    let items: Vec<PostResponse> = posts.into_iter().map(PostResponse::from).collect();
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/posts",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Post submitted; status tells whether it awaits validation", body = PostResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Not a member or banned", body = AppError),
    ),
    tag = "posts"
)]
pub async fn create_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<CreatePostRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let post = PostService::new(db)
        .submit(
            id,
            auth_user.user_id,
            NewPost {
                title: payload.title,
                content: payload.content,
                image_url: payload.image_url,
            },
        )
        .await?;
    Ok(ApiResponse::ok(PostResponse::from(post)))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post details", body = PostResponse),
        (status = 404, description = "Post not found, or pending and not visible to the caller", body = AppError),
    ),
    tag = "posts"
)]
pub async fn get_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let post = PostService::new(db)
        .get_visible(id, auth_user.map(|u| u.user_id))
        .await?;
    Ok(ApiResponse::ok(PostResponse::from(post)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Post ID"),
        ("reason" = Option<String>, Query, description = "Reason shown to the author"),
        ("moderator" = Option<bool>, Query, description = "Delete as a forum moderator"),
    ),
    responses(
        (status = 200, description = "Post removed, or already gone", body = PostRemoval),
        (status = 403, description = "Not the author or a moderator", body = AppError),
    ),
    tag = "posts"
)]
pub async fn delete_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Query(params): Query<DeletePostQuery>,
) -> AppResult<impl IntoResponse> {
    let reason = params
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("Deleted by author");
    let removal = PostService::new(db)
        .delete(id, auth_user.user_id, reason, params.moderator)
        .await?;
    Ok(ApiResponse::ok(removal))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/validate",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post published", body = PostResponse),
        (status = 403, description = "Moderators only", body = AppError),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn validate_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let post = PostService::new(db).validate(id, auth_user.user_id).await?;
    Ok(ApiResponse::ok(PostResponse::from(post)))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/reject",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Post ID")),
    request_body = RejectPostRequest,
    responses(
        (status = 200, description = "Post rejected and archived", body = PostRemoval),
        (status = 403, description = "Moderators only", body = AppError),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn reject_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<RejectPostRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let removal = PostService::new(db)
        .reject(id, auth_user.user_id, &payload.reason)
        .await?;
    Ok(ApiResponse::ok(removal))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/react",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Post ID")),
    request_body = ReactRequest,
    responses(
        (status = 200, description = "Reaction toggled", body = ReactionSummary),
        (status = 400, description = "Unknown reaction", body = AppError),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "posts"
)]
pub async fn react_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ReactRequest>,
) -> AppResult<impl IntoResponse> {
    let kind = match payload.kind.as_str() {
        "like" => ReactionKind::Like,
        "dislike" => ReactionKind::Dislike,
        _ => {
            return Err(AppError::Validation(
                "kind must be 'like' or 'dislike'".to_string(),
            ))
        }
    };
    let summary = PostService::new(db)
        .react(id, auth_user.user_id, kind)
        .await?;
    Ok(ApiResponse::ok(summary))
}
