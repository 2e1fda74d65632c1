mod common;

use common::*;
use medcircle::error::AppError;
use medcircle::models::{BanDuration, ModerationAction, Severity, UserRole};
use medcircle::services::ban::BanService;
use medcircle::services::comment::{CommentService, MAX_DEPTH};
use medcircle::services::moderation_report::ModerationReportService;

#[tokio::test]
async fn root_comment_updates_counters() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Ask a cardiologist").await;

    let comment = CommentService::new(db.clone())
        .create(post.id, patient.id, "  Is coffee safe?  ", None)
        .await
        .unwrap();
    assert_eq!(comment.depth, 0);
    assert_eq!(comment.parent_id, None);
    assert_eq!(comment.content, "Is coffee safe?");

    assert_eq!(reload_post(&db, post.id).await.comment_count, 1);
    assert_eq!(reload_user(&db, patient.id).await.contribution_count, 1);
}

#[tokio::test]
async fn replies_nest_until_the_depth_limit() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let other = create_user(&db, "other", UserRole::Doctor).await;
    join(&db, forum.id, other.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Deep thread").await;
    let service = CommentService::new(db.clone());

    let mut parent = service
        .create(post.id, owner.id, "Level 0", None)
        .await
        .unwrap();
    for level in 1..=MAX_DEPTH {
        let author = if level % 2 == 0 { owner.id } else { other.id };
        let reply = service
            .create(post.id, author, &format!("Level {}", level), Some(parent.id))
            .await
            .unwrap();
        assert_eq!(reply.depth, level);
        assert_eq!(reply.parent_id, Some(parent.id));
        parent = reply;
    }
    assert_eq!(parent.depth, 8);

    let too_deep = service
        .create(post.id, owner.id, "Level 9", Some(parent.id))
        .await;
    assert!(matches!(too_deep, Err(AppError::MaxDepthExceeded)));

    assert_eq!(service.list_by_post(post.id).await.unwrap().len(), 9);
    // Every reply authored by `other` answered a comment by `owner`.
    assert_eq!(notifications_of(&db, owner.id, "comment_reply").await.len(), 4);
}

#[tokio::test]
async fn only_clinicians_reply() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Questions welcome").await;
    let service = CommentService::new(db.clone());

    let root = service
        .create(post.id, owner.id, "Ask away", None)
        .await
        .unwrap();
    let reply = service
        .create(post.id, patient.id, "Thanks!", Some(root.id))
        .await;
    assert!(matches!(reply, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn parent_must_belong_to_the_same_post() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let first = submit_post(&db, forum.id, owner.id, "First").await;
    let second = submit_post(&db, forum.id, owner.id, "Second").await;
    let service = CommentService::new(db.clone());

    let root = service.create(first.id, owner.id, "Here", None).await.unwrap();
    let result = service
        .create(second.id, owner.id, "There", Some(root.id))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn like_then_unlike_restores_aura() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Hydration").await;
    let service = CommentService::new(db.clone());
    let comment = service
        .create(post.id, owner.id, "Drink water", None)
        .await
        .unwrap();

    let liked = service.like(comment.id, patient.id).await.unwrap();
    assert!(liked.liked);
    assert_eq!(liked.like_count, 1);
    assert_eq!(reload_user(&db, owner.id).await.aura, 1);

    let unliked = service.like(comment.id, patient.id).await.unwrap();
    assert!(!unliked.liked);
    assert_eq!(unliked.like_count, 0);
    assert_eq!(reload_user(&db, owner.id).await.aura, 0);
}

#[tokio::test]
async fn self_like_counts_but_earns_no_aura() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let post = submit_post(&db, forum.id, owner.id, "Vanity").await;
    let service = CommentService::new(db.clone());
    let comment = service.create(post.id, owner.id, "Me", None).await.unwrap();

    let liked = service.like(comment.id, owner.id).await.unwrap();
    assert_eq!(liked.like_count, 1);
    assert_eq!(reload_user(&db, owner.id).await.aura, 0);
}

#[tokio::test]
async fn edits_keep_history() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Dosage").await;
    let service = CommentService::new(db.clone());
    let comment = service
        .create(post.id, patient.id, "Take 50mg", None)
        .await
        .unwrap();

    let edited = service
        .edit(comment.id, patient.id, "Take 5mg")
        .await
        .unwrap();
    assert_eq!(edited.content, "Take 5mg");

    let history = service.edit_history(comment.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_content, "Take 50mg");

    let noop = service.edit(comment.id, patient.id, "  Take 5mg ").await;
    assert!(matches!(noop, Err(AppError::Validation(_))));

    let not_author = service.edit(comment.id, owner.id, "Take 10mg").await;
    assert!(matches!(not_author, Err(AppError::Forbidden)));
    assert_eq!(service.edit_history(comment.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_takes_the_whole_subtree() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let doctor = create_user(&db, "doctor", UserRole::Doctor).await;
    join(&db, forum.id, doctor.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Thread").await;
    let service = CommentService::new(db.clone());

    let root = service.create(post.id, doctor.id, "Root", None).await.unwrap();
    let child = service
        .create(post.id, owner.id, "Child", Some(root.id))
        .await
        .unwrap();
    service
        .create(post.id, doctor.id, "Grandchild", Some(child.id))
        .await
        .unwrap();
    let sibling = service.create(post.id, owner.id, "Sibling", None).await.unwrap();
    service.like(child.id, doctor.id).await.unwrap();
    service.edit(child.id, owner.id, "Child, edited").await.unwrap();

    let removed = service.delete(root.id, doctor.id, false, None).await.unwrap();
    assert_eq!(removed, 3);

    let remaining = service.list_by_post(post.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, sibling.id);
    assert!(service.edit_history(child.id).await.unwrap().is_empty());

    assert_eq!(reload_post(&db, post.id).await.comment_count, 1);
    // Sibling stays; the post itself counts as one contribution for the owner.
    assert_eq!(reload_user(&db, owner.id).await.contribution_count, 2);
    assert_eq!(reload_user(&db, doctor.id).await.contribution_count, 0);

    // Author deletion is silent.
    assert!(notifications_of(&db, doctor.id, "comment_deleted").await.is_empty());

    let missing = service.delete(root.id, doctor.id, false, None).await.unwrap();
    assert_eq!(missing, 0);
}

#[tokio::test]
async fn moderator_delete_notifies_and_reports() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Moderated").await;
    let service = CommentService::new(db.clone());
    let comment = service
        .create(post.id, patient.id, "Buy my supplements", None)
        .await
        .unwrap();

    let stranger = service.delete(comment.id, patient.id + 1000, true, None).await;
    assert!(stranger.is_err());

    let removed = service
        .delete(comment.id, owner.id, true, Some("Advertising"))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let notes = notifications_of(&db, patient.id, "comment_deleted").await;
    assert_eq!(notes.len(), 1);
    assert!(notes[0].message.contains("Advertising"));

    let (reports, _) = ModerationReportService::new(db.clone())
        .list(None, Some(patient.id), 1, 20)
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].action_type, ModerationAction::CommentDeletion);
    assert_eq!(reports[0].severity, Severity::Low);
    assert_eq!(reports[0].forum_id, Some(forum.id));
}

#[tokio::test]
async fn non_author_needs_moderation_flag() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    let other = create_user(&db, "other", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    join(&db, forum.id, other.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Guarded").await;
    let service = CommentService::new(db.clone());
    let comment = service
        .create(post.id, patient.id, "Mine", None)
        .await
        .unwrap();

    let as_author = service.delete(comment.id, other.id, false, None).await;
    assert!(matches!(as_author, Err(AppError::Forbidden)));
    let as_moderator = service.delete(comment.id, other.id, true, None).await;
    assert!(matches!(as_moderator, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn banned_users_cannot_comment() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Open thread").await;
    BanService::new(db.clone())
        .ban(
            forum.id,
            owner.id,
            patient.id,
            "Harassing other members",
            BanDuration::Permanent,
        )
        .await
        .unwrap();

    let result = CommentService::new(db.clone())
        .create(post.id, patient.id, "Let me back in", None)
        .await;
    assert!(matches!(result, Err(AppError::AlreadyBanned)));
}

#[tokio::test]
async fn pending_posts_take_no_comments() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, true).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let post = submit_post(&db, forum.id, patient.id, "Not yet visible").await;

    let result = CommentService::new(db.clone())
        .create(post.id, owner.id, "Early bird", None)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn banned_users_cannot_like() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let post = submit_post(&db, forum.id, owner.id, "Sleep hygiene").await;
    let service = CommentService::new(db.clone());
    let comment = service
        .create(post.id, owner.id, "No screens after ten", None)
        .await
        .unwrap();
    service.like(comment.id, patient.id).await.unwrap();
    assert_eq!(reload_user(&db, owner.id).await.aura, 1);

    BanService::new(db.clone())
        .ban(
            forum.id,
            owner.id,
            patient.id,
            "Brigading the comment section",
            BanDuration::Permanent,
        )
        .await
        .unwrap();

    // Neither a new like nor taking the old one back moves aura.
    let result = service.like(comment.id, patient.id).await;
    assert!(matches!(result, Err(AppError::AlreadyBanned)));
    assert_eq!(reload_user(&db, owner.id).await.aura, 1);
    assert_eq!(service.get_by_id(comment.id).await.unwrap().like_count, 1);
}
