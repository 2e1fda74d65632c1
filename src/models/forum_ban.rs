//! Append-only ban ledger for a forum. Lifting a ban flips `is_active`;
//! rows are never deleted while the forum exists.

use chrono::{Duration, NaiveDateTime};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BanDuration {
    #[sea_orm(string_value = "1d")]
    #[serde(rename = "1d")]
    OneDay,
    #[sea_orm(string_value = "7d")]
    #[serde(rename = "7d")]
    SevenDays,
    #[sea_orm(string_value = "30d")]
    #[serde(rename = "30d")]
    ThirtyDays,
    #[sea_orm(string_value = "permanent")]
    #[serde(rename = "permanent")]
    Permanent,
}

impl BanDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::Permanent => "permanent",
        }
    }

    /// When a ban issued at `banned_at` would lapse. `None` for permanent bans.
    ///
    /// The registry never consults this; callers that enforce expiry do.
    pub fn expires_at(&self, banned_at: NaiveDateTime) -> Option<NaiveDateTime> {
        let days = match self {
            Self::OneDay => 1,
            Self::SevenDays => 7,
            Self::ThirtyDays => 30,
            Self::Permanent => return None,
        };
        Some(banned_at + Duration::days(days))
    }
}

impl FromStr for BanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(Self::OneDay),
            "7d" => Ok(Self::SevenDays),
            "30d" => Ok(Self::ThirtyDays),
            "permanent" => Ok(Self::Permanent),
            other => Err(format!(
                "invalid ban duration '{}', expected 1d/7d/30d/permanent",
                other
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forum_bans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub forum_id: i32,
    pub user_id: i32,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    pub duration: BanDuration,
    pub banned_at: DateTime,
    pub banned_by: i32,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::forum::Entity",
        from = "Column::ForumId",
        to = "super::forum::Column::Id",
        on_delete = "Cascade"
    )]
    Forum,
}

impl Related<super::forum::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Forum.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
