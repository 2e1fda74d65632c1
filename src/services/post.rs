use crate::{
    error::{AppError, AppResult},
    models::{
        comment, comment_edit, comment_like, deleted_post, post, post_reaction, Comment,
        CommentEdit, CommentLike, DeleteType, DeletedPost, DeletedPostModel, ModerationAction,
        Post, PostModel, PostReaction, PostStatus, ReactionKind, UserRole,
    },
    services::{
        ban::is_banned,
        forum::{find_forum, forum_role, require_moderator, ForumRole},
        moderation_report::{ModerationReportService, ReportEntry},
        notification::{NewNotification, NotificationKind, NotificationService},
        stats::{self, Stat},
        user::find_user,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    /// Already-uploaded image; storage is handled elsewhere.
    pub image_url: Option<String>,
}

/// A post is either live in `posts` or archived in `deleted_posts`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentState {
    Live(PostModel),
    Archived(DeletedPostModel),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PostRemoval {
    /// False when the post was already gone.
    pub removed: bool,
    pub deleted_comments: u64,
    pub deleted_images: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReactionSummary {
    pub likes: u64,
    pub dislikes: u64,
    /// `like`, `dislike`, or null when the toggle cleared the reaction.
    pub user_reaction: Option<String>,
}

pub struct PostService {
    db: DatabaseConnection,
}

impl PostService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<PostModel> {
        Post::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// A post as `viewer` may see it. Pending posts exist only for their
    /// author and the forum's moderators; everyone else gets `NotFound`.
    pub async fn get_visible(&self, id: i32, viewer: Option<i32>) -> AppResult<PostModel> {
        let post = self.get_by_id(id).await?;
        if post.status == PostStatus::Active {
            return Ok(post);
        }

        let Some(viewer_id) = viewer else {
            return Err(AppError::NotFound);
        };
        if post.author_id == viewer_id {
            return Ok(post);
        }

        let forum = find_forum(&self.db, post.forum_id).await?;
        let viewer = find_user(&self.db, viewer_id).await?;
        match require_moderator(&self.db, &forum, &viewer).await {
            Ok(_) => Ok(post),
            Err(AppError::Forbidden) => Err(AppError::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Active posts of a forum, newest first.
    pub async fn list_by_forum(
        &self,
        forum_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<PostModel>, u64)> {
        find_forum(&self.db, forum_id).await?;
        let paginator = Post::find()
            .filter(post::Column::ForumId.eq(forum_id))
            .filter(post::Column::Status.eq(PostStatus::Active))
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((posts, total))
    }

    /// The moderation queue, oldest first.
    pub async fn list_pending(&self, forum_id: i32, actor_id: i32) -> AppResult<Vec<PostModel>> {
        let forum = find_forum(&self.db, forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_moderator(&self.db, &forum, &actor).await?;

        Ok(Post::find()
            .filter(post::Column::ForumId.eq(forum.id))
            .filter(post::Column::Status.eq(PostStatus::Pending))
            .order_by_asc(post::Column::CreatedAt)
            .order_by_asc(post::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn submit(&self, forum_id: i32, author_id: i32, new: NewPost) -> AppResult<PostModel> {
        let title = new.title.trim();
        let content = new.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(AppError::Validation(
                "Title and content are required".to_string(),
            ));
        }

        let forum = find_forum(&self.db, forum_id).await?;
        let author = find_user(&self.db, author_id).await?;
        if is_banned(&self.db, forum.id, author.id).await? {
            return Err(AppError::AlreadyBanned);
        }

        let txn = self.db.begin().await?;

        if is_banned(&txn, forum.id, author.id).await? {
            return Err(AppError::AlreadyBanned);
        }
        let role = forum_role(&txn, &forum, author.id).await?;
        if !role.is_member() {
            return Err(AppError::Forbidden);
        }

        let status = if forum.requires_post_approval
            && role == ForumRole::Member
            && author.role != UserRole::Admin
        {
            PostStatus::Pending
        } else {
            PostStatus::Active
        };

        let now = chrono::Utc::now().naive_utc();
        let created = post::ActiveModel {
            forum_id: sea_orm::ActiveValue::Set(forum.id),
            author_id: sea_orm::ActiveValue::Set(author.id),
            title: sea_orm::ActiveValue::Set(title.to_string()),
            content: sea_orm::ActiveValue::Set(content.to_string()),
            image_url: sea_orm::ActiveValue::Set(new.image_url),
            status: sea_orm::ActiveValue::Set(status),
            comment_count: sea_orm::ActiveValue::Set(0),
            view_count: sea_orm::ActiveValue::Set(0),
            validated_at: sea_orm::ActiveValue::Set(None),
            validated_by: sea_orm::ActiveValue::Set(None),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut changes = vec![
            (Stat::UserPosts(author.id), 1),
            (Stat::UserContributions(author.id), 1),
        ];
        if status == PostStatus::Active {
            changes.push((Stat::ForumPosts(forum.id), 1));
        }
        stats::apply(&txn, &changes).await?;

        txn.commit().await?;

        if status == PostStatus::Pending {
            NotificationService::new(self.db.clone())
                .emit(
                    NewNotification::new(
                        forum.owner_id,
                        NotificationKind::PostPendingReview,
                        "Post awaiting review",
                        format!("{} submitted \"{}\" in {}", author.username, created.title, forum.name),
                    )
                    .with_data(serde_json::json!({
                        "forum_id": forum.id,
                        "post_id": created.id,
                    })),
                )
                .await;
        }

        Ok(created)
    }

    /// Publishes a pending post. Already-active posts are returned unchanged.
    pub async fn validate(&self, post_id: i32, actor_id: i32) -> AppResult<PostModel> {
        let existing = self.get_by_id(post_id).await?;
        let forum = find_forum(&self.db, existing.forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_moderator(&self.db, &forum, &actor).await?;

        let (post, transitioned) = self.activate(post_id, actor.id).await?;
        if transitioned {
            tracing::info!(post_id, moderator_id = actor.id, "Post validated");
        }
        Ok(post)
    }

    /// One transaction per post. Returns the post and whether it changed state.
    async fn activate(&self, post_id: i32, actor_id: i32) -> AppResult<(PostModel, bool)> {
        let txn = self.db.begin().await?;
        let current = Post::find_by_id(post_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        if current.status == PostStatus::Active {
            return Ok((current, false));
        }

        let now = chrono::Utc::now().naive_utc();
        let forum_id = current.forum_id;
        let mut active: post::ActiveModel = current.into();
        active.status = sea_orm::ActiveValue::Set(PostStatus::Active);
        active.validated_at = sea_orm::ActiveValue::Set(Some(now));
        active.validated_by = sea_orm::ActiveValue::Set(Some(actor_id));
        active.updated_at = sea_orm::ActiveValue::Set(now);
        let updated = active.update(&txn).await?;

        stats::increment(&txn, Stat::ForumPosts(forum_id), 1).await?;
        txn.commit().await?;

        NotificationService::new(self.db.clone())
            .emit(
                NewNotification::new(
                    updated.author_id,
                    NotificationKind::PostApproved,
                    "Post approved",
                    format!("Your post \"{}\" is now visible", updated.title),
                )
                .with_data(serde_json::json!({
                    "forum_id": updated.forum_id,
                    "post_id": updated.id,
                })),
            )
            .await;

        Ok((updated, true))
    }

    /// Publishes every pending post in the forum. A failing post is logged and
    /// skipped; earlier transitions stay committed. Returns how many changed.
    pub async fn validate_posts_batch(&self, forum_id: i32, actor_id: i32) -> AppResult<usize> {
        let pending: Vec<i32> = Post::find()
            .select_only()
            .column(post::Column::Id)
            .filter(post::Column::ForumId.eq(forum_id))
            .filter(post::Column::Status.eq(PostStatus::Pending))
            .order_by_asc(post::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut validated = 0;
        for post_id in pending {
            match self.activate(post_id, actor_id).await {
                Ok((_, true)) => validated += 1,
                Ok((_, false)) => {}
                Err(e) => {
                    tracing::warn!("Batch validation skipped post {}: {}", post_id, e);
                }
            }
        }

        tracing::info!(
            forum_id,
            moderator_id = actor_id,
            validated,
            "Pending posts published"
        );
        Ok(validated)
    }

    /// Archives and removes a post a moderator refused.
    pub async fn reject(&self, post_id: i32, actor_id: i32, reason: &str) -> AppResult<PostRemoval> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("A rejection reason is required".to_string()));
        }

        let existing = self.get_by_id(post_id).await?;
        let forum = find_forum(&self.db, existing.forum_id).await?;
        let actor = find_user(&self.db, actor_id).await?;
        require_moderator(&self.db, &forum, &actor).await?;

        let removal = self
            .remove(post_id, actor.id, reason, Some(DeleteType::ModeratorRejection))
            .await?;
        if !removal.removed {
            return Err(AppError::NotFound);
        }

        tracing::info!(
            post_id,
            moderator_id = actor.id,
            author_id = existing.author_id,
            "Post rejected"
        );

        ModerationReportService::new(self.db.clone())
            .record(ReportEntry {
                user_id: existing.author_id,
                moderator_id: actor.id,
                reason: reason.to_string(),
                action: ModerationAction::PostRejection,
                post_id: Some(existing.id),
                forum_id: Some(existing.forum_id),
            })
            .await;

        NotificationService::new(self.db.clone())
            .emit(
                NewNotification::new(
                    existing.author_id,
                    NotificationKind::PostRejected,
                    "Post rejected",
                    format!("Your post \"{}\" was rejected: {}", existing.title, reason),
                )
                .with_data(serde_json::json!({
                    "forum_id": existing.forum_id,
                    "post_id": existing.id,
                })),
            )
            .await;

        Ok(removal)
    }

    /// Deletes a post. Authors may delete their own; moderator deletions are
    /// archived, reported and notified. A missing post is success.
    pub async fn delete(
        &self,
        post_id: i32,
        actor_id: i32,
        reason: &str,
        is_moderator_action: bool,
    ) -> AppResult<PostRemoval> {
        let Some(existing) = Post::find_by_id(post_id).one(&self.db).await? else {
            return Ok(PostRemoval::default());
        };

        let actor = find_user(&self.db, actor_id).await?;
        if is_moderator_action {
            let forum = find_forum(&self.db, existing.forum_id).await?;
            require_moderator(&self.db, &forum, &actor).await?;
        } else if existing.author_id != actor.id {
            return Err(AppError::Forbidden);
        }

        self.purge(post_id, actor.id, reason, is_moderator_action).await
    }

    /// Deletion without the permission check, for callers that already did it.
    pub(crate) async fn purge(
        &self,
        post_id: i32,
        actor_id: i32,
        reason: &str,
        is_moderator_action: bool,
    ) -> AppResult<PostRemoval> {
        let archive = is_moderator_action.then_some(DeleteType::ModeratorDeletion);
        let Some(existing) = Post::find_by_id(post_id).one(&self.db).await? else {
            return Ok(PostRemoval::default());
        };

        let removal = self.remove(post_id, actor_id, reason, archive).await?;
        if !removal.removed || !is_moderator_action {
            return Ok(removal);
        }

        tracing::info!(
            post_id,
            moderator_id = actor_id,
            author_id = existing.author_id,
            deleted_comments = removal.deleted_comments,
            "Post deleted by moderator"
        );

        ModerationReportService::new(self.db.clone())
            .record(ReportEntry {
                user_id: existing.author_id,
                moderator_id: actor_id,
                reason: reason.to_string(),
                action: ModerationAction::PostDeletion,
                post_id: Some(existing.id),
                forum_id: Some(existing.forum_id),
            })
            .await;

        if existing.author_id != actor_id {
            NotificationService::new(self.db.clone())
                .emit(
                    NewNotification::new(
                        existing.author_id,
                        NotificationKind::PostDeleted,
                        "Post removed",
                        format!("Your post \"{}\" was removed: {}", existing.title, reason),
                    )
                    .with_data(serde_json::json!({
                        "forum_id": existing.forum_id,
                        "post_id": existing.id,
                    })),
                )
                .await;
        }

        Ok(removal)
    }

    /// Moves a post out of `posts` in one transaction: optional archive copy,
    /// then comments with their likes and edits, reactions, and the post.
    async fn remove(
        &self,
        post_id: i32,
        actor_id: i32,
        reason: &str,
        archive: Option<DeleteType>,
    ) -> AppResult<PostRemoval> {
        let txn = self.db.begin().await?;

        let Some(existing) = Post::find_by_id(post_id).one(&txn).await? else {
            return Ok(PostRemoval::default());
        };

        if let Some(delete_type) = archive {
            let likes = PostReaction::find()
                .filter(post_reaction::Column::PostId.eq(post_id))
                .filter(post_reaction::Column::Kind.eq(ReactionKind::Like))
                .count(&txn)
                .await? as i32;
            let dislikes = PostReaction::find()
                .filter(post_reaction::Column::PostId.eq(post_id))
                .filter(post_reaction::Column::Kind.eq(ReactionKind::Dislike))
                .count(&txn)
                .await? as i32;

            deleted_post::ActiveModel {
                id: sea_orm::ActiveValue::Set(existing.id),
                forum_id: sea_orm::ActiveValue::Set(existing.forum_id),
                author_id: sea_orm::ActiveValue::Set(existing.author_id),
                title: sea_orm::ActiveValue::Set(existing.title.clone()),
                content: sea_orm::ActiveValue::Set(existing.content.clone()),
                image_url: sea_orm::ActiveValue::Set(existing.image_url.clone()),
                status: sea_orm::ActiveValue::Set(existing.status),
                created_at: sea_orm::ActiveValue::Set(existing.created_at),
                validated_at: sea_orm::ActiveValue::Set(existing.validated_at),
                validated_by: sea_orm::ActiveValue::Set(existing.validated_by),
                deleted_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
                deleted_by: sea_orm::ActiveValue::Set(actor_id),
                delete_reason: sea_orm::ActiveValue::Set(reason.trim().to_string()),
                delete_type: sea_orm::ActiveValue::Set(delete_type),
                likes_at_deletion: sea_orm::ActiveValue::Set(likes),
                dislikes_at_deletion: sea_orm::ActiveValue::Set(dislikes),
                comment_count_at_deletion: sea_orm::ActiveValue::Set(existing.comment_count),
                view_count_at_deletion: sea_orm::ActiveValue::Set(existing.view_count),
            }
            .insert(&txn)
            .await?;
        }

        let comments: Vec<(i32, i32)> = Comment::find()
            .select_only()
            .column(comment::Column::Id)
            .column(comment::Column::AuthorId)
            .filter(comment::Column::PostId.eq(post_id))
            .into_tuple()
            .all(&txn)
            .await?;
        let comment_ids: Vec<i32> = comments.iter().map(|(id, _)| *id).collect();

        if !comment_ids.is_empty() {
            CommentLike::delete_many()
                .filter(comment_like::Column::CommentId.is_in(comment_ids.clone()))
                .exec(&txn)
                .await?;
            CommentEdit::delete_many()
                .filter(comment_edit::Column::CommentId.is_in(comment_ids.clone()))
                .exec(&txn)
                .await?;
            Comment::delete_many()
                .filter(comment::Column::PostId.eq(post_id))
                .exec(&txn)
                .await?;
        }

        PostReaction::delete_many()
            .filter(post_reaction::Column::PostId.eq(post_id))
            .exec(&txn)
            .await?;
        Post::delete_by_id(post_id).exec(&txn).await?;

        let mut changes = vec![
            (Stat::UserPosts(existing.author_id), -1),
            (Stat::UserContributions(existing.author_id), -1),
        ];
        if existing.status == PostStatus::Active {
            changes.push((Stat::ForumPosts(existing.forum_id), -1));
        }
        for (author_id, delta) in stats::group_by_user(comments.iter().map(|(_, a)| *a), -1) {
            changes.push((Stat::UserContributions(author_id), delta));
        }
        stats::apply(&txn, &changes).await?;

        txn.commit().await?;

        Ok(PostRemoval {
            removed: true,
            deleted_comments: comment_ids.len() as u64,
            deleted_images: u64::from(existing.image_url.is_some()),
        })
    }

    pub async fn content_state(&self, post_id: i32) -> AppResult<ContentState> {
        if let Some(live) = Post::find_by_id(post_id).one(&self.db).await? {
            return Ok(ContentState::Live(live));
        }
        self.archived(post_id).await.map(ContentState::Archived)
    }

    pub async fn archived(&self, post_id: i32) -> AppResult<DeletedPostModel> {
        DeletedPost::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Toggles a like or dislike. Reacting with the other kind replaces the
    /// previous reaction.
    pub async fn react(
        &self,
        post_id: i32,
        user_id: i32,
        kind: ReactionKind,
    ) -> AppResult<ReactionSummary> {
        let existing = self.get_by_id(post_id).await?;
        if existing.status != PostStatus::Active {
            return Err(AppError::NotFound);
        }
        if is_banned(&self.db, existing.forum_id, user_id).await? {
            return Err(AppError::AlreadyBanned);
        }

        let txn = self.db.begin().await?;
        if is_banned(&txn, existing.forum_id, user_id).await? {
            return Err(AppError::AlreadyBanned);
        }
        let previous = PostReaction::find_by_id((post_id, user_id)).one(&txn).await?;
        let user_reaction = match previous {
            Some(prev) if prev.kind == kind => {
                PostReaction::delete_by_id((post_id, user_id)).exec(&txn).await?;
                None
            }
            Some(prev) => {
                let mut active: post_reaction::ActiveModel = prev.into();
                active.kind = sea_orm::ActiveValue::Set(kind);
                active.update(&txn).await?;
                Some(kind)
            }
            None => {
                post_reaction::ActiveModel {
                    post_id: sea_orm::ActiveValue::Set(post_id),
                    user_id: sea_orm::ActiveValue::Set(user_id),
                    kind: sea_orm::ActiveValue::Set(kind),
                    created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
                }
                .insert(&txn)
                .await?;
                Some(kind)
            }
        };

        let likes = PostReaction::find()
            .filter(post_reaction::Column::PostId.eq(post_id))
            .filter(post_reaction::Column::Kind.eq(ReactionKind::Like))
            .count(&txn)
            .await?;
        let dislikes = PostReaction::find()
            .filter(post_reaction::Column::PostId.eq(post_id))
            .filter(post_reaction::Column::Kind.eq(ReactionKind::Dislike))
            .count(&txn)
            .await?;
        txn.commit().await?;

        Ok(ReactionSummary {
            likes,
            dislikes,
            user_reaction: user_reaction.map(|k| k.as_str().to_string()),
        })
    }
}
