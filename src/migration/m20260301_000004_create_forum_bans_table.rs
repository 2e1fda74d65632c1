use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ForumBans {
    Table,
    Id,
    ForumId,
    UserId,
    Reason,
    Duration,
    BannedAt,
    BannedBy,
    IsActive,
}

#[derive(DeriveIden)]
enum Forums {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ForumBans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ForumBans::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ForumBans::ForumId).integer().not_null())
                    .col(ColumnDef::new(ForumBans::UserId).integer().not_null())
                    .col(ColumnDef::new(ForumBans::Reason).text().not_null())
                    .col(ColumnDef::new(ForumBans::Duration).string_len(16).not_null())
                    .col(ColumnDef::new(ForumBans::BannedAt).timestamp().not_null())
                    .col(ColumnDef::new(ForumBans::BannedBy).integer().not_null())
                    .col(
                        ColumnDef::new(ForumBans::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forum_bans_forum_id")
                            .from(ForumBans::Table, ForumBans::ForumId)
                            .to(Forums::Table, Forums::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forum_bans_forum_user_active")
                    .table(ForumBans::Table)
                    .col(ForumBans::ForumId)
                    .col(ForumBans::UserId)
                    .col(ForumBans::IsActive)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumBans::Table).to_owned())
            .await
    }
}
