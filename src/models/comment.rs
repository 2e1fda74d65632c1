use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub parent_id: Option<i32>,
    /// 0 for root comments, parent depth + 1 for replies.
    pub depth: i32,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub like_count: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id"
    )]
    Post,
    #[sea_orm(has_many = "super::comment_like::Entity")]
    Likes,
    #[sea_orm(has_many = "super::comment_edit::Entity")]
    Edits,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl Related<super::comment_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::comment_edit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Edits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
