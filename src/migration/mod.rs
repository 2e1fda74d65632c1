use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users_table;
mod m20260301_000002_create_forums_table;
mod m20260301_000003_create_forum_membership_tables;
mod m20260301_000004_create_forum_bans_table;
mod m20260301_000005_create_posts_tables;
mod m20260301_000006_create_comments_tables;
mod m20260301_000007_create_moderation_reports_table;
mod m20260301_000008_create_notifications_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users_table::Migration),
            Box::new(m20260301_000002_create_forums_table::Migration),
            Box::new(m20260301_000003_create_forum_membership_tables::Migration),
            Box::new(m20260301_000004_create_forum_bans_table::Migration),
            Box::new(m20260301_000005_create_posts_tables::Migration),
            Box::new(m20260301_000006_create_comments_tables::Migration),
            Box::new(m20260301_000007_create_moderation_reports_table::Migration),
            Box::new(m20260301_000008_create_notifications_table::Migration),
        ]
    }
}
