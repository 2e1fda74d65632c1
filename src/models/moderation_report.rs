use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    #[sea_orm(string_value = "post_rejection")]
    PostRejection,
    #[sea_orm(string_value = "post_deletion")]
    PostDeletion,
    #[sea_orm(string_value = "comment_deletion")]
    CommentDeletion,
    #[sea_orm(string_value = "community_ban")]
    CommunityBan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

impl ModerationAction {
    pub fn severity(&self) -> Severity {
        match self {
            Self::PostRejection => Severity::Medium,
            Self::PostDeletion | Self::CommunityBan => Severity::High,
            Self::CommentDeletion => Severity::Low,
        }
    }
}

pub const STATUS_PENDING_REVIEW: &str = "pending_review";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "moderation_reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The user the action was taken against.
    pub user_id: i32,
    pub moderator_id: i32,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    pub action_type: ModerationAction,
    pub severity: Severity,
    pub post_id: Option<i32>,
    pub forum_id: Option<i32>,
    #[sea_orm(column_type = "String(StringLen::N(20))")]
    pub status: String,
    pub reported_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
