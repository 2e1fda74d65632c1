//! Counter ledger shared by every moderation operation.
//!
//! All counters move through `UPDATE ... SET col = col + delta` on the caller's
//! connection, so a counter change commits or rolls back together with the
//! business write that caused it.

use crate::{
    error::AppResult,
    models::{comment, forum, forum_member, post, user, Comment, Forum, ForumMember, Post, User},
};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

/// A single counter column on a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    ForumMembers(i32),
    ForumPosts(i32),
    UserAura(i32),
    UserPosts(i32),
    UserContributions(i32),
    UserJoinedForums(i32),
    PostComments(i32),
    CommentLikes(i32),
}

impl Stat {
    /// Position in the row lock order: forums, posts, comments, then users,
    /// each by ascending id.
    fn lock_key(&self) -> (u8, i32) {
        match *self {
            Stat::ForumMembers(id) | Stat::ForumPosts(id) => (0, id),
            Stat::PostComments(id) => (1, id),
            Stat::CommentLikes(id) => (2, id),
            Stat::UserAura(id)
            | Stat::UserPosts(id)
            | Stat::UserContributions(id)
            | Stat::UserJoinedForums(id) => (3, id),
        }
    }
}

pub async fn increment<C: ConnectionTrait>(conn: &C, stat: Stat, delta: i32) -> AppResult<()> {
    if delta == 0 {
        return Ok(());
    }

    let rows = match stat {
        Stat::ForumMembers(id) => {
            Forum::update_many()
                .col_expr(
                    forum::Column::MemberCount,
                    Expr::col(forum::Column::MemberCount).add(delta),
                )
                .filter(forum::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
        Stat::ForumPosts(id) => {
            Forum::update_many()
                .col_expr(
                    forum::Column::PostCount,
                    Expr::col(forum::Column::PostCount).add(delta),
                )
                .filter(forum::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
        Stat::UserAura(id) => {
            User::update_many()
                .col_expr(user::Column::Aura, Expr::col(user::Column::Aura).add(delta))
                .filter(user::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
        Stat::UserPosts(id) => {
            User::update_many()
                .col_expr(
                    user::Column::PostCount,
                    Expr::col(user::Column::PostCount).add(delta),
                )
                .filter(user::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
        Stat::UserContributions(id) => {
            User::update_many()
                .col_expr(
                    user::Column::ContributionCount,
                    Expr::col(user::Column::ContributionCount).add(delta),
                )
                .filter(user::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
        Stat::UserJoinedForums(id) => {
            User::update_many()
                .col_expr(
                    user::Column::JoinedForumsCount,
                    Expr::col(user::Column::JoinedForumsCount).add(delta),
                )
                .filter(user::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
        Stat::PostComments(id) => {
            Post::update_many()
                .col_expr(
                    post::Column::CommentCount,
                    Expr::col(post::Column::CommentCount).add(delta),
                )
                .filter(post::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
        Stat::CommentLikes(id) => {
            Comment::update_many()
                .col_expr(
                    comment::Column::LikeCount,
                    Expr::col(comment::Column::LikeCount).add(delta),
                )
                .filter(comment::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
    };

    // A counter on a row that no longer exists is not an error for the caller.
    if rows.rows_affected == 0 {
        tracing::debug!("Stat {:?} matched no row (delta {})", stat, delta);
    }

    Ok(())
}

/// Applies several counter changes on the same connection.
///
/// Changes run in lock order rather than the order given, so concurrent
/// transactions touching the same rows always lock them in the same sequence.
pub async fn apply<C: ConnectionTrait>(conn: &C, changes: &[(Stat, i32)]) -> AppResult<()> {
    for (stat, delta) in lock_order(changes) {
        increment(conn, stat, delta).await?;
    }
    Ok(())
}

/// `changes` sorted by row lock order. Stable, so several columns of the
/// same row keep their relative order.
pub fn lock_order(changes: &[(Stat, i32)]) -> Vec<(Stat, i32)> {
    let mut ordered = changes.to_vec();
    ordered.sort_by_key(|(stat, _)| stat.lock_key());
    ordered
}

/// Rewrites `joined_forums_count` from the membership table. Returns the new value.
pub async fn recount_joined_forums<C: ConnectionTrait>(conn: &C, user_id: i32) -> AppResult<i32> {
    let count = ForumMember::find()
        .filter(forum_member::Column::UserId.eq(user_id))
        .count(conn)
        .await? as i32;

    User::update_many()
        .col_expr(user::Column::JoinedForumsCount, Expr::value(count))
        .filter(user::Column::Id.eq(user_id))
        .exec(conn)
        .await?;

    Ok(count)
}

/// Sums per-user deltas so each author gets one UPDATE.
pub fn group_by_user(user_ids: impl IntoIterator<Item = i32>, delta: i32) -> Vec<(i32, i32)> {
    let mut totals: Vec<(i32, i32)> = Vec::new();
    for id in user_ids {
        match totals.iter_mut().find(|(uid, _)| *uid == id) {
            Some((_, total)) => *total += delta,
            None => totals.push((id, delta)),
        }
    }
    totals
}
