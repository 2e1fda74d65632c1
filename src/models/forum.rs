use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forums")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub rules: Option<String>,
    pub owner_id: i32,
    /// New members land in `forum_pending_members` until approved.
    pub requires_approval: bool,
    /// Posts by plain members start out `pending`.
    pub requires_post_approval: bool,
    pub member_count: i32,
    pub post_count: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::forum_member::Entity")]
    Members,
    #[sea_orm(has_many = "super::forum_moderator::Entity")]
    Moderators,
    #[sea_orm(has_many = "super::forum_pending_member::Entity")]
    PendingMembers,
    #[sea_orm(has_many = "super::forum_ban::Entity")]
    Bans,
}

impl Related<super::forum_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::forum_moderator::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Moderators.def()
    }
}

impl Related<super::forum_pending_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PendingMembers.def()
    }
}

impl Related<super::forum_ban::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
