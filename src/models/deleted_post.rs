//! Archived copy of a removed post, keyed by the original post id.
//!
//! Written in the same transaction that deletes the live row and never
//! updated afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::post::PostStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum DeleteType {
    #[sea_orm(string_value = "moderator_rejection")]
    ModeratorRejection,
    #[sea_orm(string_value = "moderator_deletion")]
    ModeratorDeletion,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deleted_posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub forum_id: i32,
    pub author_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub image_url: Option<String>,
    pub status: PostStatus,
    pub created_at: DateTime,
    pub validated_at: Option<DateTime>,
    pub validated_by: Option<i32>,
    pub deleted_at: DateTime,
    pub deleted_by: i32,
    #[sea_orm(column_type = "Text")]
    pub delete_reason: String,
    pub delete_type: DeleteType,
    pub likes_at_deletion: i32,
    pub dislikes_at_deletion: i32,
    pub comment_count_at_deletion: i32,
    pub view_count_at_deletion: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
