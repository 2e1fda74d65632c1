use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum ModerationReports {
    Table,
    Id,
    UserId,
    ModeratorId,
    Reason,
    ActionType,
    Severity,
    PostId,
    ForumId,
    Status,
    ReportedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ModerationReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModerationReports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ModerationReports::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(ModerationReports::ModeratorId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationReports::Reason).text().not_null())
                    .col(
                        ColumnDef::new(ModerationReports::ActionType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModerationReports::Severity)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationReports::PostId).integer().null())
                    .col(ColumnDef::new(ModerationReports::ForumId).integer().null())
                    .col(
                        ColumnDef::new(ModerationReports::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending_review"),
                    )
                    .col(
                        ColumnDef::new(ModerationReports::ReportedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_moderation_reports_status_reported_at")
                    .table(ModerationReports::Table)
                    .col(ModerationReports::Status)
                    .col(ModerationReports::ReportedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModerationReports::Table).to_owned())
            .await
    }
}
