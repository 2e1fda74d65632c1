//! Per-forum ban list. Bans are appended, never deleted; lifting one only
//! clears `is_active`.

use crate::{
    error::{AppError, AppResult},
    models::{
        forum_ban, forum_member, forum_moderator, forum_pending_member, BanDuration, ForumBan,
        ForumBanModel, ForumMember, ForumModerator, ForumPendingMember, ModerationAction,
    },
    services::{
        forum::{find_forum, forum_role, require_moderator, ForumRole},
        moderation_report::{ModerationReportService, ReportEntry},
        notification::{NewNotification, NotificationKind, NotificationService},
        stats::{self, Stat},
        user::find_user,
    },
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

pub const MIN_REASON_LEN: usize = 10;

/// True iff any ban record for the pair is active. Duration is not consulted.
pub async fn is_banned<C: ConnectionTrait>(conn: &C, forum_id: i32, user_id: i32) -> AppResult<bool> {
    Ok(active_ban(conn, forum_id, user_id).await?.is_some())
}

/// The most recent active record for the pair, if any.
pub async fn active_ban<C: ConnectionTrait>(
    conn: &C,
    forum_id: i32,
    user_id: i32,
) -> AppResult<Option<ForumBanModel>> {
    Ok(ForumBan::find()
        .filter(forum_ban::Column::ForumId.eq(forum_id))
        .filter(forum_ban::Column::UserId.eq(user_id))
        .filter(forum_ban::Column::IsActive.eq(true))
        .order_by_desc(forum_ban::Column::Id)
        .one(conn)
        .await?)
}

fn validate_reason(reason: &str) -> AppResult<String> {
    let trimmed = reason.trim();
    if trimmed.chars().count() < MIN_REASON_LEN {
        return Err(AppError::Validation(format!(
            "Ban reason must be at least {} characters",
            MIN_REASON_LEN
        )));
    }
    Ok(trimmed.to_string())
}

pub struct BanService {
    db: DatabaseConnection,
}

impl BanService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends an active ban and strips membership, moderator status and any
    /// pending request in the same transaction.
    pub async fn ban(
        &self,
        forum_id: i32,
        actor_id: i32,
        user_id: i32,
        reason: &str,
        duration: BanDuration,
    ) -> AppResult<ForumBanModel> {
        let reason = validate_reason(reason)?;
        let forum = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        let actor_role = require_moderator(&self.db, &forum, &actor).await?;

        if user_id == forum.owner_id {
            return Err(AppError::Forbidden);
        }
        if user_id == actor_id {
            return Err(AppError::Validation("You cannot ban yourself".to_string()));
        }
        find_user(&self.db, user_id).await?;

        let target_role = forum_role(&self.db, &forum, user_id).await?;
        if target_role == ForumRole::Moderator
            && actor_role != ForumRole::Owner
            && !actor.role.is_admin()
        {
            return Err(AppError::Forbidden);
        }

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let ban = forum_ban::ActiveModel {
            forum_id: sea_orm::ActiveValue::Set(forum.id),
            user_id: sea_orm::ActiveValue::Set(user_id),
            reason: sea_orm::ActiveValue::Set(reason.clone()),
            duration: sea_orm::ActiveValue::Set(duration),
            banned_at: sea_orm::ActiveValue::Set(now),
            banned_by: sea_orm::ActiveValue::Set(actor.id),
            is_active: sea_orm::ActiveValue::Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let removed = ForumMember::delete_many()
            .filter(forum_member::Column::ForumId.eq(forum.id))
            .filter(forum_member::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        if removed.rows_affected > 0 {
            stats::apply(
                &txn,
                &[
                    (Stat::ForumMembers(forum.id), -1),
                    (Stat::UserJoinedForums(user_id), -1),
                ],
            )
            .await?;
        }

        ForumModerator::delete_many()
            .filter(forum_moderator::Column::ForumId.eq(forum.id))
            .filter(forum_moderator::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        ForumPendingMember::delete_many()
            .filter(forum_pending_member::Column::ForumId.eq(forum.id))
            .filter(forum_pending_member::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        tracing::info!(
            forum_id = forum.id,
            moderator_id = actor.id,
            user_id,
            duration = duration.as_str(),
            "User banned from forum"
        );

        NotificationService::new(self.db.clone())
            .emit(
                NewNotification::new(
                    user_id,
                    NotificationKind::CommunityBan,
                    "You have been banned",
                    format!("You were banned from {}: {}", forum.name, reason),
                )
                .with_data(serde_json::json!({
                    "forum_id": forum.id,
                    "duration": duration.as_str(),
                })),
            )
            .await;

        ModerationReportService::new(self.db.clone())
            .record(ReportEntry {
                user_id,
                moderator_id: actor.id,
                reason,
                action: ModerationAction::CommunityBan,
                post_id: None,
                forum_id: Some(forum.id),
            })
            .await;

        Ok(ban)
    }

    /// Deactivates every active record for the pair. Membership is not restored.
    pub async fn unban(&self, forum_id: i32, actor_id: i32, user_id: i32) -> AppResult<u64> {
        let forum = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_moderator(&self.db, &forum, &actor).await?;

        let result = ForumBan::update_many()
            .col_expr(forum_ban::Column::IsActive, Expr::value(false))
            .filter(forum_ban::Column::ForumId.eq(forum.id))
            .filter(forum_ban::Column::UserId.eq(user_id))
            .filter(forum_ban::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        tracing::info!(
            forum_id = forum.id,
            moderator_id = actor.id,
            user_id,
            "User unbanned from forum"
        );

        NotificationService::new(self.db.clone())
            .emit(
                NewNotification::new(
                    user_id,
                    NotificationKind::CommunityUnban,
                    "Your ban was lifted",
                    format!("You may rejoin {}", forum.name),
                )
                .with_data(serde_json::json!({ "forum_id": forum.id })),
            )
            .await;

        Ok(result.rows_affected)
    }

    pub async fn is_banned(&self, forum_id: i32, user_id: i32) -> AppResult<bool> {
        is_banned(&self.db, forum_id, user_id).await
    }

    pub async fn active_ban(&self, forum_id: i32, user_id: i32) -> AppResult<Option<ForumBanModel>> {
        active_ban(&self.db, forum_id, user_id).await
    }

    /// Full history in insertion order. Moderators only.
    pub async fn list_bans(&self, forum_id: i32, actor_id: i32) -> AppResult<Vec<ForumBanModel>> {
        let forum = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_moderator(&self.db, &forum, &actor).await?;

        Ok(ForumBan::find()
            .filter(forum_ban::Column::ForumId.eq(forum.id))
            .order_by_asc(forum_ban::Column::Id)
            .all(&self.db)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_reason_rejected() {
        assert!(matches!(
            validate_reason("   spam    "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn reason_is_trimmed() {
        assert_eq!(
            validate_reason("  repeated misinformation  ").unwrap(),
            "repeated misinformation"
        );
    }
}
