pub mod ban;
pub mod comment;
pub mod community;
pub mod forum;
pub mod membership;
pub mod moderation_report;
pub mod notification;
pub mod post;
pub mod stats;
pub mod user;
