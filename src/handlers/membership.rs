use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{ForumModeratorModel, ForumPendingMemberModel};
use crate::response::ApiResponse;
use crate::services::membership::{JoinOutcome, MembershipService};
use axum::{extract::Path, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingMemberResponse {
    pub user_id: i32,
    pub user_name: String,
    pub user_email: String,
    pub user_role: String,
    pub requested_at: String,
}

impl From<ForumPendingMemberModel> for PendingMemberResponse {
    fn from(p: ForumPendingMemberModel) -> Self {
        Self {
            user_id: p.user_id,
            user_name: p.user_name,
            user_email: p.user_email,
            user_role: p.user_role,
            requested_at: p.requested_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModeratorResponse {
    pub user_id: i32,
    pub added_at: String,
    pub added_by: i32,
}

impl From<ForumModeratorModel> for ModeratorResponse {
    fn from(m: ForumModeratorModel) -> Self {
        Self {
            user_id: m.user_id,
            added_at: m.added_at.to_string(),
            added_by: m.added_by,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnershipTransferResponse {
    pub new_owner_id: i32,
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/join",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Joined, or request queued", body = JoinOutcome),
        (status = 403, description = "Banned from this forum", body = AppError),
        (status = 409, description = "Already a member or pending", body = AppError),
    ),
    tag = "membership"
)]
pub async fn join_forum(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let outcome = MembershipService::new(db).join(id, auth_user.user_id).await?;
    let message = if outcome.requires_approval {
        "Join request submitted"
    } else {
        "Joined forum"
    };
    Ok(ApiResponse::with_message(outcome, message))
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/leave",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Left forum", body = String),
        (status = 400, description = "Owner must transfer ownership first", body = AppError),
        (status = 404, description = "Not a member", body = AppError),
    ),
    tag = "membership"
)]
pub async fn leave_forum(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    MembershipService::new(db).leave(id, auth_user.user_id).await?;
    Ok(ApiResponse::ok("Left forum"))
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/owner/leave",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Ownership transferred", body = OwnershipTransferResponse),
        (status = 403, description = "Owner only", body = AppError),
        (status = 409, description = "No moderator to take over", body = AppError),
    ),
    tag = "membership"
)]
pub async fn leave_as_owner(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let new_owner_id = MembershipService::new(db)
        .leave_as_owner(id, auth_user.user_id)
        .await?;
    Ok(ApiResponse::ok(OwnershipTransferResponse { new_owner_id }))
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{id}/members/pending",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Pending join requests", body = Vec<PendingMemberResponse>),
        (status = 403, description = "Moderators only", body = AppError),
    ),
    tag = "membership"
)]
pub async fn list_pending_members(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let pending = MembershipService::new(db)
        .list_pending(id, auth_user.user_id)
        .await?;
    let items: Vec<PendingMemberResponse> =
        pending.into_iter().map(PendingMemberResponse::from).collect();
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/members/{user_id}/approve",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Forum ID"),
        ("user_id" = i32, Path, description = "Requesting user ID"),
    ),
    responses(
        (status = 200, description = "Request approved", body = String),
        (status = 403, description = "Moderators only", body = AppError),
        (status = 404, description = "No pending request", body = AppError),
    ),
    tag = "membership"
)]
pub async fn approve_member(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<impl IntoResponse> {
    MembershipService::new(db)
        .approve(id, auth_user.user_id, user_id)
        .await?;
    Ok(ApiResponse::ok("Membership approved"))
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/members/{user_id}/reject",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Forum ID"),
        ("user_id" = i32, Path, description = "Requesting user ID"),
    ),
    responses(
        (status = 200, description = "Request rejected", body = String),
        (status = 403, description = "Moderators only", body = AppError),
        (status = 404, description = "No pending request", body = AppError),
    ),
    tag = "membership"
)]
pub async fn reject_member(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<impl IntoResponse> {
    MembershipService::new(db)
        .reject(id, auth_user.user_id, user_id)
        .await?;
    Ok(ApiResponse::ok("Membership rejected"))
}

#[utoipa::path(
    get,
    path = "/api/v1/forums/{id}/moderators",
    params(("id" = i32, Path, description = "Forum ID")),
    responses(
        (status = 200, description = "Forum moderators in appointment order", body = Vec<ModeratorResponse>),
        (status = 404, description = "Forum not found", body = AppError),
    ),
    tag = "membership"
)]
pub async fn list_moderators(
    Extension(db): Extension<DatabaseConnection>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let moderators = MembershipService::new(db).list_moderators(id).await?;
    let items: Vec<ModeratorResponse> =
        moderators.into_iter().map(ModeratorResponse::from).collect();
    Ok(ApiResponse::ok(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/forums/{id}/moderators/{user_id}",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Forum ID"),
        ("user_id" = i32, Path, description = "Member to promote"),
    ),
    responses(
        (status = 200, description = "Moderator added", body = ModeratorResponse),
        (status = 400, description = "Target is not an eligible member", body = AppError),
        (status = 403, description = "Owner or admin only", body = AppError),
        (status = 409, description = "Already a moderator", body = AppError),
    ),
    tag = "membership"
)]
pub async fn add_moderator(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<impl IntoResponse> {
    let moderator = MembershipService::new(db)
        .add_moderator(id, auth_user.user_id, user_id)
        .await?;
    Ok(ApiResponse::ok(ModeratorResponse::from(moderator)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/forums/{id}/moderators/{user_id}",
    security(("jwt_token" = [])),
    params(
        ("id" = i32, Path, description = "Forum ID"),
        ("user_id" = i32, Path, description = "Moderator to demote"),
    ),
    responses(
        (status = 200, description = "Moderator removed", body = String),
        (status = 403, description = "Owner or admin only", body = AppError),
        (status = 404, description = "Not a moderator", body = AppError),
    ),
    tag = "membership"
)]
pub async fn remove_moderator(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<impl IntoResponse> {
    MembershipService::new(db)
        .remove_moderator(id, auth_user.user_id, user_id)
        .await?;
    Ok(ApiResponse::ok("Moderator removed"))
}
