use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ForumMembers {
    Table,
    ForumId,
    UserId,
    JoinedAt,
}

#[derive(DeriveIden)]
enum ForumModerators {
    Table,
    Id,
    ForumId,
    UserId,
    AddedAt,
    AddedBy,
}

#[derive(DeriveIden)]
enum ForumPendingMembers {
    Table,
    ForumId,
    UserId,
    RequestedAt,
    UserName,
    UserEmail,
    UserRole,
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
                    .table(ForumMembers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ForumMembers::ForumId).integer().not_null())
                    .col(ColumnDef::new(ForumMembers::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(ForumMembers::JoinedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(ForumMembers::ForumId)
                            .col(ForumMembers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forum_members_forum_id")
                            .from(ForumMembers::Table, ForumMembers::ForumId)
                            .to(Forums::Table, Forums::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Cascade step 2 looks memberships up by user.
        manager
            .create_index(
                Index::create()
                    .name("idx_forum_members_user_id")
                    .table(ForumMembers::Table)
                    .col(ForumMembers::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ForumModerators::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ForumModerators::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ForumModerators::ForumId).integer().not_null())
                    .col(ColumnDef::new(ForumModerators::UserId).integer().not_null())
                    .col(ColumnDef::new(ForumModerators::AddedAt).timestamp().not_null())
                    .col(ColumnDef::new(ForumModerators::AddedBy).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forum_moderators_forum_id")
                            .from(ForumModerators::Table, ForumModerators::ForumId)
                            .to(Forums::Table, Forums::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_forum_moderators_forum_user")
                    .table(ForumModerators::Table)
                    .col(ForumModerators::ForumId)
                    .col(ForumModerators::UserId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ForumPendingMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ForumPendingMembers::ForumId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ForumPendingMembers::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ForumPendingMembers::RequestedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ForumPendingMembers::UserName)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ForumPendingMembers::UserEmail)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ForumPendingMembers::UserRole)
                            .string_len(20)
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ForumPendingMembers::ForumId)
                            .col(ForumPendingMembers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_forum_pending_members_forum_id")
                            .from(ForumPendingMembers::Table, ForumPendingMembers::ForumId)
                            .to(Forums::Table, Forums::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ForumPendingMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ForumModerators::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ForumMembers::Table).to_owned())
            .await
    }
}
