use crate::{
    config::moderation::ModerationConfig,
    error::{AppError, AppResult},
    models::{notification, Notification, NotificationModel},
};
use chrono::{Duration, NaiveDateTime};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    MembershipRequest,
    MembershipApproved,
    MembershipRejected,
    ModeratorAdded,
    ModeratorRemoved,
    OwnershipTransferred,
    CommunityBan,
    CommunityUnban,
    PostPendingReview,
    PostApproved,
    PostRejected,
    PostDeleted,
    CommentReply,
    CommentDeleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MembershipRequest => "membership_request",
            Self::MembershipApproved => "membership_approved",
            Self::MembershipRejected => "membership_rejected",
            Self::ModeratorAdded => "moderator_added",
            Self::ModeratorRemoved => "moderator_removed",
            Self::OwnershipTransferred => "ownership_transferred",
            Self::CommunityBan => "community_ban",
            Self::CommunityUnban => "community_unban",
            Self::PostPendingReview => "post_pending_review",
            Self::PostApproved => "post_approved",
            Self::PostRejected => "post_rejected",
            Self::PostDeleted => "post_deleted",
            Self::CommentReply => "comment_reply",
            Self::CommentDeleted => "comment_deleted",
        }
    }
}

/// A notification about to be written.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i32,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub action_data: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new(
        user_id: i32,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            action_data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.action_data = Some(data);
        self
    }
}

pub struct NotificationService {
    db: DatabaseConnection,
    config: ModerationConfig,
}

impl NotificationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            config: ModerationConfig::global(),
        }
    }

    pub fn with_config(mut self, config: ModerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Writes the record and trims the recipient's inbox. Failures are logged
    /// and swallowed; the triggering operation has already committed.
    pub async fn emit(&self, new: NewNotification) {
        let user_id = new.user_id;
        let kind = new.kind;
        if let Err(e) = self.insert(new).await {
            tracing::warn!(
                "Failed to create {} notification for user {}: {}",
                kind.as_str(),
                user_id,
                e
            );
            return;
        }

        if let Err(e) = self.cleanup(user_id).await {
            tracing::warn!("Notification cleanup failed for user {}: {}", user_id, e);
        }
    }

    async fn insert(&self, new: NewNotification) -> AppResult<NotificationModel> {
        let now = chrono::Utc::now().naive_utc();
        let action_data = match new.action_data {
            Some(data) => Some(
                serde_json::to_string(&data)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?,
            ),
            None => None,
        };

        let model = notification::ActiveModel {
            user_id: sea_orm::ActiveValue::Set(new.user_id),
            kind: sea_orm::ActiveValue::Set(new.kind.as_str().to_string()),
            title: sea_orm::ActiveValue::Set(new.title),
            message: sea_orm::ActiveValue::Set(new.message),
            is_read: sea_orm::ActiveValue::Set(false),
            action_data: sea_orm::ActiveValue::Set(action_data),
            created_at: sea_orm::ActiveValue::Set(now),
            expires_at: sea_orm::ActiveValue::Set(
                now + Duration::days(self.config.notification_ttl_days),
            ),
            ..Default::default()
        };

        Ok(model.insert(&self.db).await?)
    }

    /// Deletes expired notifications, then the oldest ones above the per-user cap.
    pub async fn cleanup(&self, user_id: i32) -> AppResult<u64> {
        let rows: Vec<(i32, NaiveDateTime)> = Notification::find()
            .select_only()
            .column(notification::Column::Id)
            .column(notification::Column::ExpiresAt)
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_asc(notification::Column::CreatedAt)
            .order_by_asc(notification::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;

        let now = chrono::Utc::now().naive_utc();
        let doomed = select_for_cleanup(&rows, now, self.config.notification_max_per_user);
        if doomed.is_empty() {
            return Ok(0);
        }

        let result = Notification::delete_many()
            .filter(notification::Column::Id.is_in(doomed))
            .exec(&self.db)
            .await?;
        tracing::debug!(
            "Removed {} notifications for user {}",
            result.rows_affected,
            user_id
        );
        Ok(result.rows_affected)
    }

    /// Live (unexpired) notifications, newest first.
    pub async fn list_for_user(
        &self,
        user_id: i32,
        unread_only: bool,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<NotificationModel>, u64)> {
        let now = chrono::Utc::now().naive_utc();
        let mut query = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::ExpiresAt.gt(now));
        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        let paginator = query
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    pub async fn unread_count(&self, user_id: i32) -> AppResult<u64> {
        let now = chrono::Utc::now().naive_utc();
        let count = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .filter(notification::Column::ExpiresAt.gt(now))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn mark_read(&self, id: i32, user_id: i32) -> AppResult<NotificationModel> {
        let existing = Notification::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        if existing.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        if existing.is_expired(chrono::Utc::now().naive_utc()) {
            return Err(AppError::NotFound);
        }
        if existing.is_read {
            return Ok(existing);
        }

        let mut active: notification::ActiveModel = existing.into();
        active.is_read = sea_orm::ActiveValue::Set(true);
        Ok(active.update(&self.db).await?)
    }

    pub async fn mark_all_read(&self, user_id: i32) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

/// Picks the ids to delete from `rows`, which must be ordered oldest first.
///
/// Every expired row goes. If more than `max` remain, the oldest of the
/// survivors go until exactly `max` are left.
pub fn select_for_cleanup(
    rows: &[(i32, NaiveDateTime)],
    now: NaiveDateTime,
    max: u64,
) -> Vec<i32> {
    let (expired, live): (Vec<(i32, NaiveDateTime)>, Vec<(i32, NaiveDateTime)>) =
        rows.iter().partition(|(_, expires_at)| *expires_at <= now);

    let mut doomed: Vec<i32> = expired.into_iter().map(|(id, _)| id).collect();
    let overflow = live.len().saturating_sub(max as usize);
    doomed.extend(live.into_iter().take(overflow).map(|(id, _)| id));
    doomed
}
