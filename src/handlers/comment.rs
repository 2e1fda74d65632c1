use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{CommentEditModel, CommentModel};
use crate::response::ApiResponse;
use crate::services::comment::{CommentService, LikeOutcome};
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCommentRequest {
    pub parent_id: Option<i32>,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentQuery {
    pub reason: Option<String>,
    #[serde(default)]
    pub moderator: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub parent_id: Option<i32>,
    pub depth: i32,
    pub content: String,
    pub like_count: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CommentModel> for CommentResponse {
    fn from(c: CommentModel) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            author_id: c.author_id,
            parent_id: c.parent_id,
            depth: c.depth,
            content: c.content,
            like_count: c.like_count,
            created_at: c.created_at.to_string(),
            updated_at: c.updated_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentEditResponse {
    pub id: i32,
    pub previous_content: String,
    pub edited_at: String,
}

impl From<CommentEditModel> for CommentEditResponse {
    fn from(e: CommentEditModel) -> Self {
        Self {
            id: e.id,
            previous_content: e.previous_content,
            edited_at: e.edited_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct CommentTreeNode {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub parent_id: Option<i32>,
    pub depth: i32,
    pub content: String,
    pub like_count: i32,
    pub created_at: String,
    pub updated_at: String,
    pub children: Vec<CommentTreeNode>,
}

impl utoipa::ToSchema for CommentTreeNode {
    fn name() -> std::borrow::Cow<'static, str> {
        "CommentTreeNode".into()
    }
}

impl utoipa::PartialSchema for CommentTreeNode {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        use utoipa::openapi::schema::{ArrayBuilder, ObjectBuilder, Schema, Type};
        utoipa::openapi::RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(Type::Object)
                .property("id", i32::schema())
                .property("post_id", i32::schema())
                .property("author_id", i32::schema())
                .property("parent_id", Option::<i32>::schema())
                .property("depth", i32::schema())
                .property("content", String::schema())
                .property("like_count", i32::schema())
                .property("created_at", String::schema())
                .property("updated_at", String::schema())
                .property(
                    "children",
                    ArrayBuilder::new()
                        .items(utoipa::openapi::Ref::from_schema_name("CommentTreeNode"))
                        .build(),
                )
                .required("id")
                .required("post_id")
                .required("author_id")
                .required("depth")
                .required("content")
                .required("like_count")
                .required("created_at")
                .required("updated_at")
                .required("children")
                .build(),
        ))
    }
}

impl From<CommentModel> for CommentTreeNode {
    fn from(c: CommentModel) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            author_id: c.author_id,
            parent_id: c.parent_id,
            depth: c.depth,
            content: c.content,
            like_count: c.like_count,
            created_at: c.created_at.to_string(),
            updated_at: c.updated_at.to_string(),
            children: Vec::new(),
        }
    }
}

/// Nests a flat, chronologically ordered comment list. Siblings keep their
/// input order; comments whose parent is missing are dropped.
fn build_comment_tree(comments: Vec<CommentModel>) -> Vec<CommentTreeNode> {
    let mut nodes: HashMap<i32, CommentTreeNode> = HashMap::new();
    let mut children_map: HashMap<Option<i32>, Vec<i32>> = HashMap::new();

    for comment in &comments {
        children_map
            .entry(comment.parent_id)
            .or_default()
            .push(comment.id);
    }
    for comment in comments {
        nodes.insert(comment.id, CommentTreeNode::from(comment));
    }

    fn attach_children(
        node_id: i32,
        nodes: &mut HashMap<i32, CommentTreeNode>,
        children_map: &HashMap<Option<i32>, Vec<i32>>,
    ) -> Option<CommentTreeNode> {
        let mut node = nodes.remove(&node_id)?;
        if let Some(child_ids) = children_map.get(&Some(node_id)) {
            node.children = child_ids
                .iter()
                .filter_map(|&child_id| attach_children(child_id, nodes, children_map))
                .collect();
        }
        Some(node)
    }

    let root_ids = children_map.get(&None).cloned().unwrap_or_default();
    root_ids
        .into_iter()
        .filter_map(|id| attach_children(id, &mut nodes, &children_map))
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}/comments",
    params(("id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comment tree", body = Vec<CommentTreeNode>),
        (status = 404, description = "Post not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn list_comments(
    Extension(db): Extension<DatabaseConnection>,
    Path(post_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let comments = CommentService::new(db).list_by_post(post_id).await?;
    Ok(ApiResponse::ok(build_comment_tree(comments)))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/comments",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Validation error or thread too deep", body = AppError),
        (status = 403, description = "Banned, or not allowed to reply", body = AppError),
        (status = 404, description = "Post or parent not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn create_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(post_id): Path<i32>,
    Json(payload): Json<CreateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let comment = CommentService::new(db)
        .create(post_id, auth_user.user_id, &payload.content, payload.parent_id)
        .await?;
    Ok(ApiResponse::ok(CommentResponse::from(comment)))
}

#[utoipa::path(
    put,
    path = "/api/v1/comments/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Author only", body = AppError),
    ),
    tag = "comments"
)]
pub async fn update_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let comment = CommentService::new(db)
        .edit(id, auth_user.user_id, &payload.content)
        .await?;
    Ok(ApiResponse::ok(CommentResponse::from(comment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/comments/{id}/edits",
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Edit history, oldest first", body = Vec<CommentEditResponse>),
        (status = 404, description = "Comment not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn list_comment_edits(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let edits = CommentService::new(db).edit_history(id).await?;
    let items: Vec<CommentEditResponse> =
        edits.into_iter().map(CommentEditResponse::from).collect();
    Ok(ApiResponse::ok(items))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentDeletionResponse {
    pub deleted_comments: u64,
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Comment ID"),
        ("reason" = Option<String>, Query, description = "Reason shown to the author"),
        ("moderator" = Option<bool>, Query, description = "Delete as a forum moderator"),
    ),
    responses(
        (status = 200, description = "Comment and replies removed", body = CommentDeletionResponse),
        (status = 403, description = "Not the author or a moderator", body = AppError),
    ),
    tag = "comments"
)]
pub async fn delete_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
    Query(params): Query<DeleteCommentQuery>,
) -> AppResult<impl IntoResponse> {
    let deleted_comments = CommentService::new(db)
        .delete(id, auth_user.user_id, params.moderator, params.reason.as_deref())
        .await?;
    Ok(ApiResponse::ok(CommentDeletionResponse { deleted_comments }))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments/{id}/like",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Like toggled", body = LikeOutcome),
        (status = 404, description = "Comment not found", body = AppError),
    ),
    tag = "comments"
)]
pub async fn like_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let outcome = CommentService::new(db).like(id, auth_user.user_id).await?;
    Ok(ApiResponse::ok(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn comment(id: i32, parent_id: Option<i32>, depth: i32) -> CommentModel {
        let at = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, id as u32)
            .unwrap();
        CommentModel {
            id,
            post_id: 1,
            author_id: 1,
            parent_id,
            depth,
            content: format!("comment {}", id),
            like_count: 0,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn tree_nests_replies_under_parents() {
        let tree = build_comment_tree(vec![
            comment(1, None, 0),
            comment(2, Some(1), 1),
            comment(3, None, 0),
            comment(4, Some(2), 2),
            comment(5, Some(1), 1),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, 1);
        assert_eq!(tree[1].id, 3);
        let replies: Vec<i32> = tree[0].children.iter().map(|c| c.id).collect();
        assert_eq!(replies, vec![2, 5]);
        assert_eq!(tree[0].children[0].children[0].id, 4);
    }

    #[test]
    fn orphans_are_dropped() {
        let tree = build_comment_tree(vec![comment(1, None, 0), comment(7, Some(99), 1)]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }
}
