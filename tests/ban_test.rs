mod common;

use common::*;
use medcircle::error::AppError;
use medcircle::models::{BanDuration, ForumMember, ForumPendingMember, Severity, UserRole};
use medcircle::services::ban::BanService;
use medcircle::services::membership::MembershipService;
use medcircle::services::moderation_report::ModerationReportService;
use sea_orm::EntityTrait;

const REASON: &str = "Repeated medical misinformation";

#[tokio::test]
async fn ban_strips_membership_moderation_and_pending_request() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let doctor = create_user(&db, "doctor", UserRole::Doctor).await;
    join(&db, forum.id, doctor.id).await;
    promote(&db, forum.id, owner.id, doctor.id).await;
    assert_eq!(reload_forum(&db, forum.id).await.member_count, 2);

    let ban = BanService::new(db.clone())
        .ban(forum.id, owner.id, doctor.id, REASON, BanDuration::SevenDays)
        .await
        .unwrap();
    assert!(ban.is_active);
    assert_eq!(ban.banned_by, owner.id);
    assert_eq!(ban.duration, BanDuration::SevenDays);

    assert!(ForumMember::find_by_id((forum.id, doctor.id))
        .one(&db)
        .await
        .unwrap()
        .is_none());
    assert!(moderator_ids(&db, forum.id).await.is_empty());
    assert_eq!(reload_forum(&db, forum.id).await.member_count, 1);
    assert_eq!(reload_user(&db, doctor.id).await.joined_forums_count, 0);

    let notes = notifications_of(&db, doctor.id, "community_ban").await;
    assert_eq!(notes.len(), 1);

    let (reports, total) = ModerationReportService::new(db.clone())
        .list(None, Some(doctor.id), 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(reports[0].severity, Severity::High);
    assert_eq!(reports[0].forum_id, Some(forum.id));
}

#[tokio::test]
async fn ban_clears_pending_join_request() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, true, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    MembershipService::new(db.clone())
        .join(forum.id, patient.id)
        .await
        .unwrap();

    BanService::new(db.clone())
        .ban(forum.id, owner.id, patient.id, REASON, BanDuration::Permanent)
        .await
        .unwrap();

    assert!(ForumPendingMember::find_by_id((forum.id, patient.id))
        .one(&db)
        .await
        .unwrap()
        .is_none());
    assert_eq!(reload_forum(&db, forum.id).await.member_count, 1);
}

#[tokio::test]
async fn banned_user_cannot_rejoin_until_unbanned() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let bans = BanService::new(db.clone());
    let membership = MembershipService::new(db.clone());

    bans.ban(forum.id, owner.id, patient.id, REASON, BanDuration::OneDay)
        .await
        .unwrap();
    assert!(bans.is_banned(forum.id, patient.id).await.unwrap());

    let rejoin = membership.join(forum.id, patient.id).await;
    assert!(matches!(rejoin, Err(AppError::AlreadyBanned)));

    assert_eq!(bans.unban(forum.id, owner.id, patient.id).await.unwrap(), 1);
    assert!(!bans.is_banned(forum.id, patient.id).await.unwrap());
    assert_eq!(
        notifications_of(&db, patient.id, "community_unban").await.len(),
        1
    );

    // Unbanning does not restore the membership.
    assert_eq!(reload_forum(&db, forum.id).await.member_count, 1);
    membership.join(forum.id, patient.id).await.unwrap();
    assert_eq!(reload_forum(&db, forum.id).await.member_count, 2);
}

#[tokio::test]
async fn short_reason_is_rejected_before_any_write() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let bans = BanService::new(db.clone());

    let result = bans
        .ban(forum.id, owner.id, patient.id, "spam", BanDuration::OneDay)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(!bans.is_banned(forum.id, patient.id).await.unwrap());
    assert_eq!(reload_forum(&db, forum.id).await.member_count, 2);
}

#[tokio::test]
async fn owner_cannot_be_banned() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let admin = create_user(&db, "admin", UserRole::Admin).await;

    let result = BanService::new(db.clone())
        .ban(forum.id, admin.id, owner.id, REASON, BanDuration::Permanent)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn moderators_cannot_ban_each_other() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let first = create_user(&db, "first", UserRole::Doctor).await;
    let second = create_user(&db, "second", UserRole::Doctor).await;
    join(&db, forum.id, first.id).await;
    join(&db, forum.id, second.id).await;
    promote(&db, forum.id, owner.id, first.id).await;
    promote(&db, forum.id, owner.id, second.id).await;
    let bans = BanService::new(db.clone());

    let result = bans
        .ban(forum.id, first.id, second.id, REASON, BanDuration::OneDay)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    bans.ban(forum.id, owner.id, second.id, REASON, BanDuration::OneDay)
        .await
        .unwrap();
    assert_eq!(moderator_ids(&db, forum.id).await, vec![first.id]);
}

#[tokio::test]
async fn moderator_can_ban_plain_member() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let doctor = create_user(&db, "doctor", UserRole::Doctor).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, doctor.id).await;
    join(&db, forum.id, patient.id).await;
    promote(&db, forum.id, owner.id, doctor.id).await;

    let ban = BanService::new(db.clone())
        .ban(forum.id, doctor.id, patient.id, REASON, BanDuration::ThirtyDays)
        .await
        .unwrap();
    assert_eq!(ban.banned_by, doctor.id);
    assert_eq!(reload_forum(&db, forum.id).await.member_count, 2);
}

#[tokio::test]
async fn unban_lifts_every_active_record() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let patient = create_user(&db, "patient", UserRole::User).await;
    join(&db, forum.id, patient.id).await;
    let bans = BanService::new(db.clone());

    bans.ban(forum.id, owner.id, patient.id, REASON, BanDuration::OneDay)
        .await
        .unwrap();
    let second = bans
        .ban(forum.id, owner.id, patient.id, REASON, BanDuration::Permanent)
        .await
        .unwrap();

    let current = bans.active_ban(forum.id, patient.id).await.unwrap().unwrap();
    assert_eq!(current.id, second.id);

    assert_eq!(bans.unban(forum.id, owner.id, patient.id).await.unwrap(), 2);
    let again = bans.unban(forum.id, owner.id, patient.id).await;
    assert!(matches!(again, Err(AppError::NotFound)));

    // History is kept, only deactivated.
    let history = bans.list_bans(forum.id, owner.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|b| !b.is_active));
}

#[tokio::test]
async fn ban_list_is_moderators_only() {
    let db = setup_db().await;
    let owner = create_user(&db, "owner", UserRole::Doctor).await;
    let forum = create_forum(&db, owner.id, false, false).await;
    let member = create_user(&db, "member", UserRole::User).await;
    join(&db, forum.id, member.id).await;

    let result = BanService::new(db.clone())
        .list_bans(forum.id, member.id)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}
