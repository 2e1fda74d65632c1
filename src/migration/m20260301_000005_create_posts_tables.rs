use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    ForumId,
    AuthorId,
    Title,
    Content,
    ImageUrl,
    Status,
    CommentCount,
    ViewCount,
    ValidatedAt,
    ValidatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PostReactions {
    Table,
    PostId,
    UserId,
    Kind,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DeletedPosts {
    Table,
    Id,
    ForumId,
    AuthorId,
    Title,
    Content,
    ImageUrl,
    Status,
    CreatedAt,
    ValidatedAt,
    ValidatedBy,
    DeletedAt,
    DeletedBy,
    DeleteReason,
    DeleteType,
    LikesAtDeletion,
    DislikesAtDeletion,
    CommentCountAtDeletion,
    ViewCountAtDeletion,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Posts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Posts::ForumId).integer().not_null())
                    .col(ColumnDef::new(Posts::AuthorId).integer().not_null())
                    .col(ColumnDef::new(Posts::Title).string_len(300).not_null())
                    .col(ColumnDef::new(Posts::Content).text().not_null())
                    .col(ColumnDef::new(Posts::ImageUrl).string_len(500).null())
                    .col(ColumnDef::new(Posts::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Posts::CommentCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Posts::ViewCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Posts::ValidatedAt).timestamp().null())
                    .col(ColumnDef::new(Posts::ValidatedBy).integer().null())
                    .col(
                        ColumnDef::new(Posts::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Posts::UpdatedAt)
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
                    .name("idx_posts_forum_status")
                    .table(Posts::Table)
                    .col(Posts::ForumId)
                    .col(Posts::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PostReactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PostReactions::PostId).integer().not_null())
                    .col(ColumnDef::new(PostReactions::UserId).integer().not_null())
                    .col(ColumnDef::new(PostReactions::Kind).string_len(10).not_null())
                    .col(
                        ColumnDef::new(PostReactions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(PostReactions::PostId)
                            .col(PostReactions::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        // Audit copies outlive the live row, so no foreign key to posts.
        manager
            .create_table(
                Table::create()
                    .table(DeletedPosts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeletedPosts::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeletedPosts::ForumId).integer().not_null())
                    .col(ColumnDef::new(DeletedPosts::AuthorId).integer().not_null())
                    .col(ColumnDef::new(DeletedPosts::Title).string_len(300).not_null())
                    .col(ColumnDef::new(DeletedPosts::Content).text().not_null())
                    .col(ColumnDef::new(DeletedPosts::ImageUrl).string_len(500).null())
                    .col(ColumnDef::new(DeletedPosts::Status).string_len(16).not_null())
                    .col(ColumnDef::new(DeletedPosts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(DeletedPosts::ValidatedAt).timestamp().null())
                    .col(ColumnDef::new(DeletedPosts::ValidatedBy).integer().null())
                    .col(ColumnDef::new(DeletedPosts::DeletedAt).timestamp().not_null())
                    .col(ColumnDef::new(DeletedPosts::DeletedBy).integer().not_null())
                    .col(ColumnDef::new(DeletedPosts::DeleteReason).text().not_null())
                    .col(
                        ColumnDef::new(DeletedPosts::DeleteType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeletedPosts::LikesAtDeletion)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DeletedPosts::DislikesAtDeletion)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DeletedPosts::CommentCountAtDeletion)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DeletedPosts::ViewCountAtDeletion)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeletedPosts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PostReactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await
    }
}
