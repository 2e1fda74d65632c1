pub mod database;
pub mod jwt;
pub mod moderation;
pub mod rate_limit;
