//! Forum deletion as a re-runnable sequence of independent transactions.
//!
//! Each step tolerates work a previous, interrupted run already did. Once the
//! forum row is gone the whole operation is a no-op.

use crate::{
    config::moderation::ModerationConfig,
    error::AppResult,
    models::{
        forum_ban, forum_member, forum_moderator, forum_pending_member, post, Forum, ForumBan,
        ForumMember, ForumModerator, ForumPendingMember, Post,
    },
    services::{
        forum::require_owner,
        post::PostService,
        stats,
        user::find_user,
    },
};
use futures_util::future::join_all;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::Serialize;
use utoipa::ToSchema;

const CASCADE_DELETE_REASON: &str = "Community deleted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FailedPost {
    pub post_id: i32,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CascadeReport {
    pub deleted_posts: u64,
    pub deleted_comments: u64,
    pub deleted_images: u64,
    pub updated_users: u64,
    /// Posts whose deletion failed; the cascade carried on without them.
    pub failed_posts: Vec<FailedPost>,
}

pub struct CommunityService {
    db: DatabaseConnection,
    config: ModerationConfig,
}

impl CommunityService {
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

    /// Deletes the forum with its posts, comments and memberships. Owner or
    /// admin only. Deleting an absent forum succeeds with an empty report.
    pub async fn delete_community(&self, forum_id: i32, actor_id: i32) -> AppResult<CascadeReport> {
        let Some(forum) = Forum::find_by_id(forum_id).one(&self.db).await? else {
            tracing::debug!("Forum {} already deleted", forum_id);
            return Ok(CascadeReport::default());
        };

        let actor = find_user(&self.db, actor_id).await?;
        require_owner(&forum, &actor)?;

        tracing::info!(forum_id, moderator_id = actor.id, "Community deletion started");

        let mut report = self.delete_posts(forum_id, actor.id).await?;
        report.updated_users = self.release_members(forum_id).await?;

        let txn = self.db.begin().await?;
        ForumPendingMember::delete_many()
            .filter(forum_pending_member::Column::ForumId.eq(forum_id))
            .exec(&txn)
            .await?;
        ForumModerator::delete_many()
            .filter(forum_moderator::Column::ForumId.eq(forum_id))
            .exec(&txn)
            .await?;
        ForumBan::delete_many()
            .filter(forum_ban::Column::ForumId.eq(forum_id))
            .exec(&txn)
            .await?;
        Forum::delete_by_id(forum_id).exec(&txn).await?;
        txn.commit().await?;

        if report.failed_posts.is_empty() {
            tracing::info!(
                forum_id,
                moderator_id = actor.id,
                deleted_posts = report.deleted_posts,
                deleted_comments = report.deleted_comments,
                updated_users = report.updated_users,
                "Community deleted"
            );
        } else {
            tracing::warn!(
                forum_id,
                failed = report.failed_posts.len(),
                "Community deleted with post failures"
            );
        }

        Ok(report)
    }

    /// Step 1: every post, concurrently, as a moderator deletion.
    async fn delete_posts(&self, forum_id: i32, actor_id: i32) -> AppResult<CascadeReport> {
        let post_ids: Vec<i32> = Post::find()
            .select_only()
            .column(post::Column::Id)
            .filter(post::Column::ForumId.eq(forum_id))
            .order_by_asc(post::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;

        let posts = PostService::new(self.db.clone());
        let results = join_all(
            post_ids
                .iter()
                .map(|id| posts.purge(*id, actor_id, CASCADE_DELETE_REASON, true)),
        )
        .await;

        let mut report = CascadeReport::default();
        for (post_id, mut result) in post_ids.into_iter().zip(results) {
            // One sequential retry before the post counts as failed.
            if let Err(e) = &result {
                tracing::debug!("Retrying cascade delete of post {}: {}", post_id, e);
                result = posts
                    .purge(post_id, actor_id, CASCADE_DELETE_REASON, true)
                    .await;
            }
            match result {
                Ok(removal) if removal.removed => {
                    report.deleted_posts += 1;
                    report.deleted_comments += removal.deleted_comments;
                    report.deleted_images += removal.deleted_images;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Cascade failed to delete post {}: {}", post_id, e);
                    report.failed_posts.push(FailedPost {
                        post_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Step 2: drop memberships in bounded batches and recount each user.
    async fn release_members(&self, forum_id: i32) -> AppResult<u64> {
        let user_ids: Vec<i32> = ForumMember::find()
            .select_only()
            .column(forum_member::Column::UserId)
            .filter(forum_member::Column::ForumId.eq(forum_id))
            .order_by_asc(forum_member::Column::UserId)
            .into_tuple()
            .all(&self.db)
            .await?;

        let batch_size = self.config.cascade_user_batch_size.max(1);
        let mut updated = 0u64;
        for chunk in user_ids.chunks(batch_size) {
            let txn = self.db.begin().await?;
            ForumMember::delete_many()
                .filter(forum_member::Column::ForumId.eq(forum_id))
                .filter(forum_member::Column::UserId.is_in(chunk.to_vec()))
                .exec(&txn)
                .await?;
            for user_id in chunk {
                stats::recount_joined_forums(&txn, *user_id).await?;
            }
            txn.commit().await?;
            updated += chunk.len() as u64;
        }
        Ok(updated)
    }
}
