use crate::error::{AppError, AppResult};
use crate::handlers::post::DeletedPostResponse;
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::{ModerationAction, ModerationReportModel, Severity};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::moderation_report::ModerationReportService;
use crate::services::post::PostService;
use axum::{extract::Path, extract::Query, response::IntoResponse, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize)]
pub struct ReportListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<String>,
    pub user_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModerationReportResponse {
    pub id: i32,
    pub user_id: i32,
    pub moderator_id: i32,
    pub reason: String,
    pub action_type: String,
    pub severity: String,
    pub post_id: Option<i32>,
    pub forum_id: Option<i32>,
    pub status: String,
    pub reported_at: String,
}

impl From<ModerationReportModel> for ModerationReportResponse {
    fn from(r: ModerationReportModel) -> Self {
        let action_type = match r.action_type {
            ModerationAction::PostRejection => "post_rejection",
            ModerationAction::PostDeletion => "post_deletion",
            ModerationAction::CommentDeletion => "comment_deletion",
            ModerationAction::CommunityBan => "community_ban",
        };
        let severity = match r.severity {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        Self {
            id: r.id,
            user_id: r.user_id,
            moderator_id: r.moderator_id,
            reason: r.reason,
            action_type: action_type.to_string(),
            severity: severity.to_string(),
            post_id: r.post_id,
            forum_id: r.forum_id,
            status: r.status,
            reported_at: r.reported_at.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/moderation-reports",
    security(("jwt_token" = [])),
    params(
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by review status"),
        ("user_id" = Option<i32>, Query, description = "Filter by sanctioned user"),
    ),
    responses(
        (status = 200, description = "Moderation reports, newest first", body = PaginatedResponse<ModerationReportResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "admin"
)]
pub async fn list_moderation_reports(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(params): Query<ReportListQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&db, &auth_user).await?;

    let (page, per_page) = PaginationQuery {
        page: params.page,
        per_page: params.per_page,
    }
    .resolve();
    let (reports, total) = ModerationReportService::new(db)
        .list(params.status.as_deref(), params.user_id, page, per_page)
        .await?;
    let items = reports
        .into_iter()
        .map(ModerationReportResponse::from)
        .collect();

    Ok(ApiResponse::ok(PaginatedResponse::new(
        items, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/deleted-posts/{id}",
    security(("jwt_token" = [])),
    params(("id" = i32, Path, description = "Original post ID")),
    responses(
        (status = 200, description = "Archived post snapshot", body = DeletedPostResponse),
        (status = 403, description = "Admin only", body = AppError),
        (status = 404, description = "No archive for this post", body = AppError),
    ),
    tag = "admin"
)]
pub async fn get_deleted_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_admin(&db, &auth_user).await?;

    let archived = PostService::new(db).archived(id).await?;
    Ok(ApiResponse::ok(DeletedPostResponse::from(archived)))
}
