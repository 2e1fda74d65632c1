mod common;

use common::*;
use medcircle::config::moderation::ModerationConfig;
use medcircle::error::AppError;
use medcircle::models::{
    comment, forum_member, post, BanDuration, Comment, Forum, ForumBan, ForumMember, Post,
    UserRole,
};
use medcircle::services::ban::BanService;
use medcircle::services::comment::CommentService;
use medcircle::services::community::{CascadeReport, CommunityService};
use medcircle::services::membership::MembershipService;
use medcircle::services::post::{NewPost, PostService};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn deleting_a_forum_removes_content_and_memberships() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let other_forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    let doctor = create_user(&db, "doctor", UserRole::Doctor).await;
    join(&db, forum.id, patient.id).await;
    join(&db, forum.id, doctor.id).await;
    join(&db, other_forum.id, patient.id).await;
    promote(&db, forum.id, owner.id, doctor.id).await;
    assert_eq!(reload_user(&db, patient.id).await.joined_forums_count, 2);
    assert_eq!(reload_user(&db, owner.id).await.joined_forums_count, 2);

    let first = submit_post(&db, forum.id, patient.id, "First").await;
    let second = PostService::new(db.clone())
        .submit(
            forum.id,
            doctor.id,
            NewPost {
                title: "Second".to_string(),
                content: "With a chart".to_string(),
                image_url: Some("https://cdn.medcircle.test/chart.png".to_string()),
            },
        )
        .await
        .unwrap();
    let survivor = submit_post(&db, other_forum.id, patient.id, "Elsewhere").await;

    let comments = CommentService::new(db.clone());
    let root = comments
        .create(first.id, patient.id, "Question", None)
        .await
        .unwrap();
    comments
        .create(first.id, doctor.id, "Answer", Some(root.id))
        .await
        .unwrap();
    comments
        .create(second.id, patient.id, "Nice chart", None)
        .await
        .unwrap();
    comments
        .create(survivor.id, patient.id, "Still here", None)
        .await
        .unwrap();

    let report = CommunityService::new(db.clone())
        .delete_community(forum.id, owner.id)
        .await
        .unwrap();
    assert_eq!(report.deleted_posts, 2);
    assert_eq!(report.deleted_comments, 3);
    assert_eq!(report.deleted_images, 1);
    assert_eq!(report.updated_users, 3);
    assert!(report.failed_posts.is_empty());

    assert!(Forum::find_by_id(forum.id).one(&db).await.unwrap().is_none());
    let orphan_posts = Post::find()
        .filter(post::Column::ForumId.eq(forum.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(orphan_posts, 0);
    let orphan_comments = Comment::find()
        .filter(comment::Column::PostId.is_in(vec![first.id, second.id]))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(orphan_comments, 0);
    let memberships = ForumMember::find()
        .filter(forum_member::Column::ForumId.eq(forum.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(memberships, 0);
    assert!(moderator_ids(&db, forum.id).await.is_empty());

    // Each member loses exactly the deleted forum.
    assert_eq!(reload_user(&db, patient.id).await.joined_forums_count, 1);
    assert_eq!(reload_user(&db, owner.id).await.joined_forums_count, 1);
    assert_eq!(reload_user(&db, doctor.id).await.joined_forums_count, 0);

    // The other forum is untouched.
    let other = reload_forum(&db, other_forum.id).await;
    assert_eq!(other.post_count, 1);
    assert_eq!(other.member_count, 2);
    assert_eq!(reload_post(&db, survivor.id).await.comment_count, 1);
}

#[tokio::test]
async fn second_deletion_is_an_empty_success() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    submit_post(&db, forum.id, owner.id, "Only post").await;
    let service = CommunityService::new(db.clone());

    let first = service.delete_community(forum.id, owner.id).await.unwrap();
    assert_eq!(first.deleted_posts, 1);

    let second = service.delete_community(forum.id, owner.id).await.unwrap();
    assert_eq!(second, CascadeReport::default());
}

#[tokio::test]
async fn deletion_is_owner_or_admin_only() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let doctor = create_user(&db, "doctor", UserRole::Doctor).await;
    let admin = create_user(&db, "admin", UserRole::Admin).await;
    join(&db, forum.id, doctor.id).await;
    promote(&db, forum.id, owner.id, doctor.id).await;
    let service = CommunityService::new(db.clone());

    let by_moderator = service.delete_community(forum.id, doctor.id).await;
    assert!(matches!(by_moderator, Err(AppError::Forbidden)));
    assert_eq!(reload_forum(&db, forum.id).await.member_count, 2);

    let report = service.delete_community(forum.id, admin.id).await.unwrap();
    assert_eq!(report.updated_users, 2);
    assert!(Forum::find_by_id(forum.id).one(&db).await.unwrap().is_none());
}

#[tokio::test]
async fn small_batches_release_every_member() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let mut members = Vec::new();
    for i in 0..5 {
        let user = create_user(&db, &format!("member{}", i), UserRole::User).await;
        join(&db, forum.id, user.id).await;
        members.push(user.id);
    }

    let report = CommunityService::new(db.clone())
        .with_config(ModerationConfig {
            cascade_user_batch_size: 2,
            ..ModerationConfig::default()
        })
        .delete_community(forum.id, owner.id)
        .await
        .unwrap();
    assert_eq!(report.updated_users, 6);

    for id in members {
        assert_eq!(reload_user(&db, id).await.joined_forums_count, 0);
    }
}

#[tokio::test]
async fn bans_and_pending_requests_go_with_the_forum() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, true, false).await;
    let applicant = create_user(&db, "applicant", UserRole::User).await;
    let troll = create_user(&db, "troll", UserRole::User).await;
    MembershipService::new(db.clone())
        .join(forum.id, applicant.id)
        .await
        .unwrap();
    BanService::new(db.clone())
        .ban(
            forum.id,
            owner.id,
            troll.id,
            "Spamming every thread",
            BanDuration::Permanent,
        )
        .await
        .unwrap();

    CommunityService::new(db.clone())
        .delete_community(forum.id, owner.id)
        .await
        .unwrap();

    assert_eq!(ForumBan::find().count(&db).await.unwrap(), 0);
    assert_eq!(
        medcircle::models::ForumPendingMember::find()
            .count(&db)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn cascade_archives_posts_as_moderator_deletions() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let post = submit_post(&db, forum.id, patient.id, "Archived on cascade").await;

    CommunityService::new(db.clone())
        .delete_community(forum.id, owner.id)
        .await
        .unwrap();

    let archived = PostService::new(db.clone()).archived(post.id).await.unwrap();
    assert_eq!(archived.delete_reason, "Community deleted");
    assert_eq!(reload_user(&db, patient.id).await.post_count, 0);
    assert_eq!(notifications_of(&db, patient.id, "post_deleted").await.len(), 1);
}

#[tokio::test]
async fn cross_commented_posts_are_all_deleted() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let mut doctors = Vec::new();
    for i in 0..4 {
        let doctor = create_user(&db, &format!("doctor{}", i), UserRole::Doctor).await;
        join(&db, forum.id, doctor.id).await;
        doctors.push(doctor.id);
    }

    // Every doctor posts once and comments on everyone else's post, so each
    // post removal touches every doctor's counters.
    let comments = CommentService::new(db.clone());
    let mut posts = Vec::new();
    for author in &doctors {
        posts.push(submit_post(&db, forum.id, *author, "Case discussion").await);
    }
    for post in &posts {
        for commenter in doctors.iter().filter(|d| **d != post.author_id) {
            comments
                .create(post.id, *commenter, "Second opinion", None)
                .await
                .unwrap();
        }
    }
    assert_eq!(reload_user(&db, doctors[0]).await.contribution_count, 4);

    let report = CommunityService::new(db.clone())
        .delete_community(forum.id, owner.id)
        .await
        .unwrap();
    assert!(report.failed_posts.is_empty());
    assert_eq!(report.deleted_posts, 4);
    assert_eq!(report.deleted_comments, 12);

    let left = Post::find()
        .filter(post::Column::ForumId.eq(forum.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(left, 0);
    for id in doctors {
        let user = reload_user(&db, id).await;
        assert_eq!(user.post_count, 0);
        assert_eq!(user.contribution_count, 0);
        assert_eq!(user.joined_forums_count, 0);
    }
}

#[tokio::test]
async fn failed_post_is_reported_and_the_rest_still_go() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let kept = submit_post(&db, forum.id, patient.id, "Stuck").await;
    let first = submit_post(&db, forum.id, patient.id, "Goes").await;
    let second = submit_post(&db, forum.id, owner.id, "Also goes").await;
    CommentService::new(db.clone())
        .create(first.id, owner.id, "Reply", None)
        .await
        .unwrap();

    db.execute_unprepared(&format!(
        "CREATE TRIGGER keep_post BEFORE DELETE ON posts WHEN OLD.id = {} \
         BEGIN SELECT RAISE(ABORT, 'post is locked'); END;",
        kept.id
    ))
    .await
    .unwrap();

    let report = CommunityService::new(db.clone())
        .delete_community(forum.id, owner.id)
        .await
        .unwrap();
    assert_eq!(report.deleted_posts, 2);
    assert_eq!(report.deleted_comments, 1);
    assert_eq!(report.failed_posts.len(), 1);
    assert_eq!(report.failed_posts[0].post_id, kept.id);
    assert!(!report.failed_posts[0].error.is_empty());

    // The failed post rolled back whole: still live, not archived.
    assert!(Forum::find_by_id(forum.id).one(&db).await.unwrap().is_none());
    assert!(Post::find_by_id(kept.id).one(&db).await.unwrap().is_some());
    assert!(Post::find_by_id(first.id).one(&db).await.unwrap().is_none());
    assert!(Post::find_by_id(second.id).one(&db).await.unwrap().is_none());
    let posts = PostService::new(db.clone());
    assert!(matches!(posts.archived(kept.id).await, Err(AppError::NotFound)));
    assert_eq!(reload_user(&db, patient.id).await.post_count, 1);
    assert_eq!(reload_user(&db, patient.id).await.joined_forums_count, 0);
}
