use crate::{
    error::{AppError, AppResult},
    models::{
        comment, comment_edit, comment_like, Comment, CommentEdit, CommentEditModel, CommentLike,
        CommentModel, ModerationAction, Post, PostStatus,
    },
    services::{
        ban::is_banned,
        forum::{find_forum, require_moderator},
        moderation_report::{ModerationReportService, ReportEntry},
        notification::{NewNotification, NotificationKind, NotificationService},
        stats::{self, Stat},
        user::find_user,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Deepest level a reply may sit at; root comments are depth 0.
pub const MAX_DEPTH: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: i32,
}

/// `root` followed by all of its descendants, depth-first.
/// `comments` holds `(id, parent_id)` pairs for one post.
pub fn collect_descendants(root: i32, comments: &[(i32, Option<i32>)]) -> Vec<i32> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        out.push(id);
        // Reverse so children are visited in their original order.
        stack.extend(
            comments
                .iter()
                .rev()
                .filter(|(_, parent)| *parent == Some(id))
                .map(|(child, _)| *child),
        );
    }
    out
}

pub struct CommentService {
    db: DatabaseConnection,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Comments of a post in creation order. Tree assembly is the caller's job.
    pub async fn list_by_post(&self, post_id: i32) -> AppResult<Vec<CommentModel>> {
        Post::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<CommentModel> {
        Comment::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn create(
        &self,
        post_id: i32,
        author_id: i32,
        content: &str,
        parent_id: Option<i32>,
    ) -> AppResult<CommentModel> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Comment cannot be empty".to_string()));
        }

        let post = Post::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        if post.status != PostStatus::Active {
            return Err(AppError::Validation(
                "Post is awaiting moderation".to_string(),
            ));
        }

        let author = find_user(&self.db, author_id).await?;
        if is_banned(&self.db, post.forum_id, author.id).await? {
            return Err(AppError::AlreadyBanned);
        }

        let parent = match parent_id {
            Some(pid) => {
                if !author.role.can_reply() {
                    return Err(AppError::Forbidden);
                }
                let parent = self.get_by_id(pid).await?;
                if parent.post_id != post.id {
                    return Err(AppError::Validation(
                        "Parent comment belongs to another post".to_string(),
                    ));
                }
                if parent.depth >= MAX_DEPTH {
                    return Err(AppError::MaxDepthExceeded);
                }
                Some(parent)
            }
            None => None,
        };
        let depth = parent.as_ref().map_or(0, |p| p.depth + 1);

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        if is_banned(&txn, post.forum_id, author.id).await? {
            return Err(AppError::AlreadyBanned);
        }

        let created = comment::ActiveModel {
            post_id: sea_orm::ActiveValue::Set(post.id),
            author_id: sea_orm::ActiveValue::Set(author.id),
            parent_id: sea_orm::ActiveValue::Set(parent.as_ref().map(|p| p.id)),
            depth: sea_orm::ActiveValue::Set(depth),
            content: sea_orm::ActiveValue::Set(content.to_string()),
            like_count: sea_orm::ActiveValue::Set(0),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        stats::apply(
            &txn,
            &[
                (Stat::PostComments(post.id), 1),
                (Stat::UserContributions(author.id), 1),
            ],
        )
        .await?;
        txn.commit().await?;

        if let Some(parent) = parent.filter(|p| p.author_id != author.id) {
            NotificationService::new(self.db.clone())
                .emit(
                    NewNotification::new(
                        parent.author_id,
                        NotificationKind::CommentReply,
                        "New reply",
                        format!("{} replied to your comment", author.username),
                    )
                    .with_data(serde_json::json!({
                        "post_id": post.id,
                        "comment_id": created.id,
                        "parent_id": parent.id,
                    })),
                )
                .await;
        }

        Ok(created)
    }

    /// Author-only. The previous text is kept in `comment_edits`.
    pub async fn edit(&self, id: i32, actor_id: i32, content: &str) -> AppResult<CommentModel> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Comment cannot be empty".to_string()));
        }

        let existing = self.get_by_id(id).await?;
        if existing.author_id != actor_id {
            return Err(AppError::Forbidden);
        }
        if existing.content.trim() == content {
            return Err(AppError::Validation("Edit does not change the comment".to_string()));
        }

        let now = chrono::Utc::now().naive_utc();
        let txn = self.db.begin().await?;

        comment_edit::ActiveModel {
            comment_id: sea_orm::ActiveValue::Set(existing.id),
            previous_content: sea_orm::ActiveValue::Set(existing.content.clone()),
            edited_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut active: comment::ActiveModel = existing.into();
        active.content = sea_orm::ActiveValue::Set(content.to_string());
        active.updated_at = sea_orm::ActiveValue::Set(now);
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    pub async fn edit_history(&self, id: i32) -> AppResult<Vec<CommentEditModel>> {
        Ok(CommentEdit::find()
            .filter(comment_edit::Column::CommentId.eq(id))
            .order_by_asc(comment_edit::Column::EditedAt)
            .order_by_asc(comment_edit::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Removes a comment and its whole subtree. Returns how many comments went.
    /// A missing comment is success.
    pub async fn delete(
        &self,
        id: i32,
        actor_id: i32,
        is_moderator_action: bool,
        reason: Option<&str>,
    ) -> AppResult<u64> {
        let Some(existing) = Comment::find_by_id(id).one(&self.db).await? else {
            return Ok(0);
        };

        let actor = find_user(&self.db, actor_id).await?;
        let post = Post::find_by_id(existing.post_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        if is_moderator_action {
            let forum = find_forum(&self.db, post.forum_id).await?;
            require_moderator(&self.db, &forum, &actor).await?;
        } else if existing.author_id != actor.id {
            return Err(AppError::Forbidden);
        }

        let txn = self.db.begin().await?;

        let thread: Vec<(i32, Option<i32>, i32)> = Comment::find()
            .select_only()
            .column(comment::Column::Id)
            .column(comment::Column::ParentId)
            .column(comment::Column::AuthorId)
            .filter(comment::Column::PostId.eq(existing.post_id))
            .order_by_asc(comment::Column::Id)
            .into_tuple()
            .all(&txn)
            .await?;
        if !thread.iter().any(|(cid, _, _)| *cid == id) {
            return Ok(0);
        }

        let edges: Vec<(i32, Option<i32>)> = thread.iter().map(|(c, p, _)| (*c, *p)).collect();
        let doomed = collect_descendants(id, &edges);
        let authors = thread
            .iter()
            .filter(|(cid, _, _)| doomed.contains(cid))
            .map(|(_, _, author)| *author);

        CommentLike::delete_many()
            .filter(comment_like::Column::CommentId.is_in(doomed.clone()))
            .exec(&txn)
            .await?;
        CommentEdit::delete_many()
            .filter(comment_edit::Column::CommentId.is_in(doomed.clone()))
            .exec(&txn)
            .await?;
        Comment::delete_many()
            .filter(comment::Column::Id.is_in(doomed.clone()))
            .exec(&txn)
            .await?;

        let removed = doomed.len() as i32;
        let mut changes = vec![(Stat::PostComments(existing.post_id), -removed)];
        for (author_id, delta) in stats::group_by_user(authors, -1) {
            changes.push((Stat::UserContributions(author_id), delta));
        }
        stats::apply(&txn, &changes).await?;

        txn.commit().await?;

        if is_moderator_action {
            let reason = reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or("Removed by a moderator")
                .to_string();

            tracing::info!(
                comment_id = id,
                moderator_id = actor.id,
                author_id = existing.author_id,
                removed,
                "Comment deleted by moderator"
            );

            if existing.author_id != actor.id {
                NotificationService::new(self.db.clone())
                    .emit(
                        NewNotification::new(
                            existing.author_id,
                            NotificationKind::CommentDeleted,
                            "Comment removed",
                            format!("Your comment was removed: {}", reason),
                        )
                        .with_data(serde_json::json!({
                            "post_id": existing.post_id,
                            "comment_id": existing.id,
                        })),
                    )
                    .await;
            }

            ModerationReportService::new(self.db.clone())
                .record(ReportEntry {
                    user_id: existing.author_id,
                    moderator_id: actor.id,
                    reason,
                    action: ModerationAction::CommentDeletion,
                    post_id: Some(existing.post_id),
                    forum_id: Some(post.forum_id),
                })
                .await;
        }

        Ok(removed as u64)
    }

    /// Toggles a like. Likes from the author do not move aura.
    pub async fn like(&self, id: i32, user_id: i32) -> AppResult<LikeOutcome> {
        let existing = self.get_by_id(id).await?;
        let post = Post::find_by_id(existing.post_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        if post.status != PostStatus::Active {
            return Err(AppError::NotFound);
        }
        find_user(&self.db, user_id).await?;
        if is_banned(&self.db, post.forum_id, user_id).await? {
            return Err(AppError::AlreadyBanned);
        }

        let txn = self.db.begin().await?;
        if is_banned(&txn, post.forum_id, user_id).await? {
            return Err(AppError::AlreadyBanned);
        }
        let previous = CommentLike::find_by_id((id, user_id)).one(&txn).await?;
        let self_like = existing.author_id == user_id;

        let (liked, delta) = match previous {
            Some(_) => {
                CommentLike::delete_by_id((id, user_id)).exec(&txn).await?;
                (false, -1)
            }
            None => {
                comment_like::ActiveModel {
                    comment_id: sea_orm::ActiveValue::Set(id),
                    user_id: sea_orm::ActiveValue::Set(user_id),
                    created_at: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
                }
                .insert(&txn)
                .await?;
                (true, 1)
            }
        };

        let mut changes = vec![(Stat::CommentLikes(id), delta)];
        if !self_like {
            changes.push((Stat::UserAura(existing.author_id), delta));
        }
        stats::apply(&txn, &changes).await?;

        let like_count = Comment::find_by_id(id)
            .one(&txn)
            .await?
            .map(|c| c.like_count)
            .ok_or(AppError::NotFound)?;
        txn.commit().await?;

        Ok(LikeOutcome { liked, like_count })
    }
}
