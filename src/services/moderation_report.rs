use crate::{
    error::AppResult,
    models::{
        moderation_report, ModerationAction, ModerationReport, ModerationReportModel,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Input for a report about a punitive moderation action.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub user_id: i32,
    pub moderator_id: i32,
    pub reason: String,
    pub action: ModerationAction,
    pub post_id: Option<i32>,
    pub forum_id: Option<i32>,
}

pub struct ModerationReportService {
    db: DatabaseConnection,
}

impl ModerationReportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Best-effort write. Acting on your own content is not reported.
    pub async fn record(&self, entry: ReportEntry) -> Option<ModerationReportModel> {
        if entry.moderator_id == entry.user_id {
            tracing::debug!(
                "Skipping {:?} report: moderator {} acted on own content",
                entry.action,
                entry.moderator_id
            );
            return None;
        }

        let action = entry.action;
        match self.insert(entry).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("Failed to file {:?} moderation report: {}", action, e);
                None
            }
        }
    }

    async fn insert(&self, entry: ReportEntry) -> AppResult<ModerationReportModel> {
        let now = chrono::Utc::now().naive_utc();
        let model = moderation_report::ActiveModel {
            user_id: sea_orm::ActiveValue::Set(entry.user_id),
            moderator_id: sea_orm::ActiveValue::Set(entry.moderator_id),
            reason: sea_orm::ActiveValue::Set(entry.reason),
            action_type: sea_orm::ActiveValue::Set(entry.action),
            severity: sea_orm::ActiveValue::Set(entry.action.severity()),
            post_id: sea_orm::ActiveValue::Set(entry.post_id),
            forum_id: sea_orm::ActiveValue::Set(entry.forum_id),
            status: sea_orm::ActiveValue::Set(moderation_report::STATUS_PENDING_REVIEW.to_string()),
            reported_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn list(
        &self,
        status: Option<&str>,
        user_id: Option<i32>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<ModerationReportModel>, u64)> {
        let mut query = ModerationReport::find();
        if let Some(s) = status {
            query = query.filter(moderation_report::Column::Status.eq(s));
        }
        if let Some(uid) = user_id {
            query = query.filter(moderation_report::Column::UserId.eq(uid));
        }

        let paginator = query
            .order_by_desc(moderation_report::Column::ReportedAt)
            .order_by_desc(moderation_report::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }
}
