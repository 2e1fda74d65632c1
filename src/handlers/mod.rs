pub mod admin;
pub mod ban;
pub mod comment;
pub mod forum;
pub mod membership;
pub mod notification;
pub mod post;
