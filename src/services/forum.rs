use crate::{
    error::{AppError, AppResult},
    models::{
        forum, forum_member, forum_moderator, Forum, ForumMember, ForumModel, ForumModerator,
        UserModel, UserRole,
    },
    services::{
        post::PostService,
        stats::{self, Stat},
        user::find_user,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};

/// What a user is within one forum, independent of their platform role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ForumRole {
    Visitor,
    Member,
    Moderator,
    Owner,
}

impl ForumRole {
    pub fn is_member(&self) -> bool {
        *self >= ForumRole::Member
    }
}

/// Resolves `user_id`'s standing in `forum`. The owner outranks any row in
/// `forum_moderators`.
pub async fn forum_role<C: ConnectionTrait>(
    conn: &C,
    forum: &ForumModel,
    user_id: i32,
) -> AppResult<ForumRole> {
    if forum.owner_id == user_id {
        return Ok(ForumRole::Owner);
    }

    let is_moderator = ForumModerator::find()
        .filter(forum_moderator::Column::ForumId.eq(forum.id))
        .filter(forum_moderator::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .is_some();
    if is_moderator {
        return Ok(ForumRole::Moderator);
    }

    let is_member = ForumMember::find_by_id((forum.id, user_id))
        .one(conn)
        .await?
        .is_some();
    Ok(if is_member {
        ForumRole::Member
    } else {
        ForumRole::Visitor
    })
}

/// Owner, forum moderator or platform admin. Returns the actor's forum role.
pub async fn require_moderator<C: ConnectionTrait>(
    conn: &C,
    forum: &ForumModel,
    actor: &UserModel,
) -> AppResult<ForumRole> {
    let role = forum_role(conn, forum, actor.id).await?;
    if role >= ForumRole::Moderator || actor.role.is_admin() {
        Ok(role)
    } else {
        Err(AppError::Forbidden)
    }
}

/// Owner or platform admin.
pub fn require_owner(forum: &ForumModel, actor: &UserModel) -> AppResult<()> {
    if forum.owner_id == actor.id || actor.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub async fn find_forum<C: ConnectionTrait>(conn: &C, forum_id: i32) -> AppResult<ForumModel> {
    Forum::find_by_id(forum_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

#[derive(Debug, Clone, Default)]
pub struct NewForum {
    pub name: String,
    pub description: String,
    pub rules: Option<String>,
    pub requires_approval: bool,
    pub requires_post_approval: bool,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ForumSettings {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rules: Option<String>,
    pub requires_approval: Option<bool>,
    pub requires_post_approval: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SettingsUpdate {
    pub forum: ForumModel,
    /// Pending posts activated because post approval was switched off.
    pub validated_posts: usize,
}

pub struct ForumService {
    db: DatabaseConnection,
}

impl ForumService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<ForumModel> {
        find_forum(&self.db, id).await
    }

    pub async fn role_of(&self, forum_id: i32, user_id: i32) -> AppResult<ForumRole> {
        let forum = find_forum(&self.db, forum_id).await?;
        forum_role(&self.db, &forum, user_id).await
    }

    /// Creates a forum with `owner_id` as its first member.
    pub async fn create(&self, owner_id: i32, new: NewForum) -> AppResult<ForumModel> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Forum name is required".to_string()));
        }

        let owner = find_user(&self.db, owner_id).await?;
        if !matches!(owner.role, UserRole::Doctor | UserRole::Admin) {
            return Err(AppError::Forbidden);
        }

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        let created = forum::ActiveModel {
            name: sea_orm::ActiveValue::Set(name.to_string()),
            description: sea_orm::ActiveValue::Set(new.description.trim().to_string()),
            rules: sea_orm::ActiveValue::Set(new.rules),
            owner_id: sea_orm::ActiveValue::Set(owner.id),
            requires_approval: sea_orm::ActiveValue::Set(new.requires_approval),
            requires_post_approval: sea_orm::ActiveValue::Set(new.requires_post_approval),
            member_count: sea_orm::ActiveValue::Set(0),
            post_count: sea_orm::ActiveValue::Set(0),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        forum_member::ActiveModel {
            forum_id: sea_orm::ActiveValue::Set(created.id),
            user_id: sea_orm::ActiveValue::Set(owner.id),
            joined_at: sea_orm::ActiveValue::Set(now),
        }
        .insert(&txn)
        .await?;

        stats::apply(
            &txn,
            &[
                (Stat::ForumMembers(created.id), 1),
                (Stat::UserJoinedForums(owner.id), 1),
            ],
        )
        .await?;

        let forum = find_forum(&txn, created.id).await?;
        txn.commit().await?;

        tracing::info!("Forum {} created by user {}", forum.id, owner.id);
        Ok(forum)
    }

    /// Owner or admin only. Turning post approval off publishes the queue.
    pub async fn update_settings(
        &self,
        forum_id: i32,
        actor_id: i32,
        settings: ForumSettings,
    ) -> AppResult<SettingsUpdate> {
        let existing = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_owner(&existing, &actor)?;

        if let Some(name) = &settings.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Forum name is required".to_string()));
            }
        }

        let was_moderated = existing.requires_post_approval;
        let now = chrono::Utc::now().naive_utc();

        let mut active: forum::ActiveModel = existing.into();
        if let Some(name) = settings.name {
            active.name = sea_orm::ActiveValue::Set(name.trim().to_string());
        }
        if let Some(description) = settings.description {
            active.description = sea_orm::ActiveValue::Set(description.trim().to_string());
        }
        if let Some(rules) = settings.rules {
            active.rules = sea_orm::ActiveValue::Set(Some(rules));
        }
        if let Some(flag) = settings.requires_approval {
            active.requires_approval = sea_orm::ActiveValue::Set(flag);
        }
        if let Some(flag) = settings.requires_post_approval {
            active.requires_post_approval = sea_orm::ActiveValue::Set(flag);
        }
        active.updated_at = sea_orm::ActiveValue::Set(now);
        let updated = active.update(&self.db).await?;

        let validated_posts = if was_moderated && !updated.requires_post_approval {
            PostService::new(self.db.clone())
                .validate_posts_batch(forum_id, actor_id)
                .await?
        } else {
            0
        };

        Ok(SettingsUpdate {
            forum: find_forum(&self.db, forum_id).await?,
            validated_posts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_outranks_moderator() {
        assert!(ForumRole::Owner > ForumRole::Moderator);
        assert!(ForumRole::Moderator > ForumRole::Member);
    }

    #[test]
    fn visitor_is_not_member() {
        assert!(!ForumRole::Visitor.is_member());
        assert!(ForumRole::Moderator.is_member());
    }
}
