use crate::{
    error::{AppError, AppResult},
    models::{
        forum, forum_member, forum_moderator, forum_pending_member, ForumMember, ForumModerator,
        ForumModeratorModel, ForumPendingMember, ForumPendingMemberModel, UserRole,
    },
    services::{
        ban::is_banned,
        forum::{find_forum, require_moderator, require_owner},
        notification::{NewNotification, NotificationKind, NotificationService},
        stats::{self, Stat},
        user::find_user,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct JoinOutcome {
    /// True when the request was queued for moderator approval.
    pub requires_approval: bool,
}

/// Moderator with the earliest `added_at`; ties go to the first row in `moderators`.
pub fn select_successor(
    moderators: &[ForumModeratorModel],
    owner_id: i32,
) -> Option<&ForumModeratorModel> {
    let mut best: Option<&ForumModeratorModel> = None;
    for m in moderators.iter().filter(|m| m.user_id != owner_id) {
        match best {
            Some(b) if m.added_at >= b.added_at => {}
            _ => best = Some(m),
        }
    }
    best
}

async fn insert_member<C: ConnectionTrait>(conn: &C, forum_id: i32, user_id: i32) -> AppResult<()> {
    forum_member::ActiveModel {
        forum_id: sea_orm::ActiveValue::Set(forum_id),
        user_id: sea_orm::ActiveValue::Set(user_id),
        joined_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
    }
    .insert(conn)
    .await?;

    stats::apply(
        conn,
        &[
            (Stat::ForumMembers(forum_id), 1),
            (Stat::UserJoinedForums(user_id), 1),
        ],
    )
    .await
}

/// Deletes the membership row and returns whether one existed.
async fn remove_member<C: ConnectionTrait>(conn: &C, forum_id: i32, user_id: i32) -> AppResult<bool> {
    let result = ForumMember::delete_many()
        .filter(forum_member::Column::ForumId.eq(forum_id))
        .filter(forum_member::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Ok(false);
    }

    stats::apply(
        conn,
        &[
            (Stat::ForumMembers(forum_id), -1),
            (Stat::UserJoinedForums(user_id), -1),
        ],
    )
    .await?;
    Ok(true)
}

async fn remove_moderator_rows<C: ConnectionTrait>(
    conn: &C,
    forum_id: i32,
    user_id: i32,
) -> AppResult<u64> {
    let result = ForumModerator::delete_many()
        .filter(forum_moderator::Column::ForumId.eq(forum_id))
        .filter(forum_moderator::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

async fn is_member<C: ConnectionTrait>(conn: &C, forum_id: i32, user_id: i32) -> AppResult<bool> {
    Ok(ForumMember::find_by_id((forum_id, user_id))
        .one(conn)
        .await?
        .is_some())
}

pub struct MembershipService {
    db: DatabaseConnection,
}

impl MembershipService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn notifications(&self) -> NotificationService {
        NotificationService::new(self.db.clone())
    }

    pub async fn join(&self, forum_id: i32, user_id: i32) -> AppResult<JoinOutcome> {
        let forum = find_forum(&self.db, forum_id).await?;
        let user = find_user(&self.db, user_id).await?;
        if is_banned(&self.db, forum.id, user.id).await? {
            return Err(AppError::AlreadyBanned);
        }

        let txn = self.db.begin().await?;

        // A ban may have landed since the check above.
        if is_banned(&txn, forum.id, user.id).await? {
            return Err(AppError::AlreadyBanned);
        }
        if is_member(&txn, forum.id, user.id).await? {
            return Err(AppError::Conflict("Already a member of this forum".to_string()));
        }
        let pending = ForumPendingMember::find_by_id((forum.id, user.id))
            .one(&txn)
            .await?;
        if pending.is_some() {
            return Err(AppError::Conflict("Join request already pending".to_string()));
        }

        if forum.requires_approval {
            forum_pending_member::ActiveModel {
                forum_id: sea_orm::ActiveValue::Set(forum.id),
                user_id: sea_orm::ActiveValue::Set(user.id),
                requested_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
                user_name: sea_orm::ActiveValue::Set(user.username.clone()),
                user_email: sea_orm::ActiveValue::Set(user.email.clone()),
                user_role: sea_orm::ActiveValue::Set(user.role.as_str().to_string()),
            }
            .insert(&txn)
            .await?;
        } else {
            insert_member(&txn, forum.id, user.id).await?;
        }

        txn.commit().await?;

        if forum.requires_approval {
            self.notifications()
                .emit(
                    NewNotification::new(
                        forum.owner_id,
                        NotificationKind::MembershipRequest,
                        "New membership request",
                        format!("{} asked to join {}", user.username, forum.name),
                    )
                    .with_data(serde_json::json!({
                        "forum_id": forum.id,
                        "user_id": user.id,
                    })),
                )
                .await;
        }

        Ok(JoinOutcome {
            requires_approval: forum.requires_approval,
        })
    }

    /// Plain members and moderators only; the owner goes through `leave_as_owner`.
    pub async fn leave(&self, forum_id: i32, user_id: i32) -> AppResult<()> {
        let forum = find_forum(&self.db, forum_id).await?;
        if forum.owner_id == user_id {
            return Err(AppError::Validation(
                "The owner must transfer ownership before leaving".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        if !remove_member(&txn, forum.id, user_id).await? {
            return Err(AppError::NotFound);
        }
        remove_moderator_rows(&txn, forum.id, user_id).await?;
        txn.commit().await?;

        tracing::debug!("User {} left forum {}", user_id, forum.id);
        Ok(())
    }

    pub async fn list_pending(
        &self,
        forum_id: i32,
        actor_id: i32,
    ) -> AppResult<Vec<ForumPendingMemberModel>> {
        let forum = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_moderator(&self.db, &forum, &actor).await?;

        Ok(ForumPendingMember::find()
            .filter(forum_pending_member::Column::ForumId.eq(forum.id))
            .order_by_asc(forum_pending_member::Column::RequestedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn approve(&self, forum_id: i32, actor_id: i32, user_id: i32) -> AppResult<()> {
        let forum = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_moderator(&self.db, &forum, &actor).await?;

        let txn = self.db.begin().await?;
        let deleted = ForumPendingMember::delete_many()
            .filter(forum_pending_member::Column::ForumId.eq(forum.id))
            .filter(forum_pending_member::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        if is_banned(&txn, forum.id, user_id).await? {
            return Err(AppError::AlreadyBanned);
        }
        if !is_member(&txn, forum.id, user_id).await? {
            insert_member(&txn, forum.id, user_id).await?;
        }
        txn.commit().await?;

        tracing::info!(
            forum_id = forum.id,
            moderator_id = actor.id,
            user_id,
            "Membership request approved"
        );

        self.notifications()
            .emit(
                NewNotification::new(
                    user_id,
                    NotificationKind::MembershipApproved,
                    "Membership approved",
                    format!("You are now a member of {}", forum.name),
                )
                .with_data(serde_json::json!({ "forum_id": forum.id })),
            )
            .await;

        Ok(())
    }

    pub async fn reject(&self, forum_id: i32, actor_id: i32, user_id: i32) -> AppResult<()> {
        let forum = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_moderator(&self.db, &forum, &actor).await?;

        let deleted = ForumPendingMember::delete_many()
            .filter(forum_pending_member::Column::ForumId.eq(forum.id))
            .filter(forum_pending_member::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        self.notifications()
            .emit(
                NewNotification::new(
                    user_id,
                    NotificationKind::MembershipRejected,
                    "Membership request declined",
                    format!("Your request to join {} was declined", forum.name),
                )
                .with_data(serde_json::json!({ "forum_id": forum.id })),
            )
            .await;

        Ok(())
    }

    /// Promotes a doctor who is already a member. Owner or admin only.
    pub async fn add_moderator(
        &self,
        forum_id: i32,
        actor_id: i32,
        user_id: i32,
    ) -> AppResult<ForumModeratorModel> {
        let forum = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_owner(&forum, &actor)?;

        if user_id == forum.owner_id {
            return Err(AppError::Validation(
                "The owner already has moderator rights".to_string(),
            ));
        }
        let target = find_user(&self.db, user_id).await?;
        if target.role != UserRole::Doctor {
            return Err(AppError::Validation(
                "Only doctors can be promoted to moderator".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        if !is_member(&txn, forum.id, target.id).await? {
            return Err(AppError::Validation(
                "User must be a member of the forum".to_string(),
            ));
        }
        let existing = ForumModerator::find()
            .filter(forum_moderator::Column::ForumId.eq(forum.id))
            .filter(forum_moderator::Column::UserId.eq(target.id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("User is already a moderator".to_string()));
        }

        let moderator = forum_moderator::ActiveModel {
            forum_id: sea_orm::ActiveValue::Set(forum.id),
            user_id: sea_orm::ActiveValue::Set(target.id),
            added_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            added_by: sea_orm::ActiveValue::Set(actor.id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        self.notifications()
            .emit(
                NewNotification::new(
                    target.id,
                    NotificationKind::ModeratorAdded,
                    "You are now a moderator",
                    format!("You were made a moderator of {}", forum.name),
                )
                .with_data(serde_json::json!({ "forum_id": forum.id })),
            )
            .await;

        Ok(moderator)
    }

    pub async fn remove_moderator(&self, forum_id: i32, actor_id: i32, user_id: i32) -> AppResult<()> {
        let forum = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_owner(&forum, &actor)?;

        if user_id == forum.owner_id {
            return Err(AppError::Validation(
                "The owner cannot be removed as moderator".to_string(),
            ));
        }

        if remove_moderator_rows(&self.db, forum.id, user_id).await? == 0 {
            return Err(AppError::NotFound);
        }

        self.notifications()
            .emit(
                NewNotification::new(
                    user_id,
                    NotificationKind::ModeratorRemoved,
                    "Moderator role removed",
                    format!("You are no longer a moderator of {}", forum.name),
                )
                .with_data(serde_json::json!({ "forum_id": forum.id })),
            )
            .await;

        Ok(())
    }

    pub async fn list_moderators(&self, forum_id: i32) -> AppResult<Vec<ForumModeratorModel>> {
        let forum = find_forum(&self.db, forum_id).await?;
        Ok(ForumModerator::find()
            .filter(forum_moderator::Column::ForumId.eq(forum.id))
            .order_by_asc(forum_moderator::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Hands the forum to the longest-serving moderator and removes the old
    /// owner from it. Returns the new owner's id.
    pub async fn leave_as_owner(&self, forum_id: i32, actor_id: i32) -> AppResult<i32> {
        let forum = find_forum(&self.db, forum_id).await?;
        if forum.owner_id != actor_id {
            return Err(AppError::Forbidden);
        }

        let moderators = self.list_moderators(forum.id).await?;
        let successor = select_successor(&moderators, forum.owner_id)
            .map(|m| m.user_id)
            .ok_or(AppError::NoSuccessorAvailable)?;

        let old_owner = forum.owner_id;
        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let current = find_forum(&txn, forum.id).await?;
        if current.owner_id != old_owner {
            return Err(AppError::Conflict("Ownership changed concurrently".to_string()));
        }

        let mut active: forum::ActiveModel = current.into();
        active.owner_id = sea_orm::ActiveValue::Set(successor);
        active.updated_at = sea_orm::ActiveValue::Set(now);
        active.update(&txn).await?;

        if remove_moderator_rows(&txn, forum.id, successor).await? == 0 {
            return Err(AppError::Conflict(
                "Successor is no longer a moderator".to_string(),
            ));
        }
        remove_moderator_rows(&txn, forum.id, old_owner).await?;
        remove_member(&txn, forum.id, old_owner).await?;

        txn.commit().await?;

        tracing::info!(
            forum_id = forum.id,
            old_owner,
            new_owner = successor,
            "Forum ownership transferred"
        );

        self.notifications()
            .emit(
                NewNotification::new(
                    successor,
                    NotificationKind::OwnershipTransferred,
                    "You now own a forum",
                    format!("Ownership of {} was transferred to you", forum.name),
                )
                .with_data(serde_json::json!({ "forum_id": forum.id })),
            )
            .await;

        Ok(successor)
    }
}
