pub mod comment;
pub mod comment_edit;
pub mod comment_like;
pub mod deleted_post;
pub mod forum;
pub mod forum_ban;
pub mod forum_member;
pub mod forum_moderator;
pub mod forum_pending_member;
pub mod moderation_report;
pub mod notification;
pub mod post;
pub mod post_reaction;
pub mod user;

pub use comment::{Entity as Comment, Model as CommentModel};
pub use comment_edit::{Entity as CommentEdit, Model as CommentEditModel};
pub use comment_like::Entity as CommentLike;
pub use deleted_post::{DeleteType, Entity as DeletedPost, Model as DeletedPostModel};
pub use forum::{Entity as Forum, Model as ForumModel};
pub use forum_ban::{BanDuration, Entity as ForumBan, Model as ForumBanModel};
pub use forum_member::Entity as ForumMember;
pub use forum_moderator::{Entity as ForumModerator, Model as ForumModeratorModel};
pub use forum_pending_member::{Entity as ForumPendingMember, Model as ForumPendingMemberModel};
pub use moderation_report::{
    Entity as ModerationReport, ModerationAction, Model as ModerationReportModel, Severity,
};
pub use notification::{Entity as Notification, Model as NotificationModel};
pub use post::{Entity as Post, Model as PostModel, PostStatus};
pub use post_reaction::{Entity as PostReaction, ReactionKind};
pub use user::{Entity as User, Model as UserModel, UserRole};
