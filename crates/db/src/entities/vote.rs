//! Vote ledger entity.
//!
//! Append-only: rows are never updated or deleted. The contestant counters
//! are a materialized sum of `quantity` over this table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where a vote was cast.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum VoteSource {
    /// Cast through the website.
    #[sea_orm(string_value = "online")]
    Online,
    /// Cast at the venue (QR code).
    #[sea_orm(string_value = "in_person")]
    InPerson,
}

/// How a vote was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    /// Daily free vote, counts against the cap.
    #[sea_orm(string_value = "free")]
    Free,
    /// Credited from a completed purchase.
    #[sea_orm(string_value = "purchased")]
    Purchased,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub contestant_id: String,

    #[sea_orm(indexed)]
    pub competition_id: String,

    /// `user:<id>` for signed-in voters, `ip:<addr>` otherwise
    pub voter_key: String,

    #[sea_orm(nullable)]
    pub voter_ip: Option<String>,

    #[sea_orm(nullable)]
    pub voter_user_id: Option<String>,

    pub source: VoteSource,

    pub kind: VoteKind,

    /// Raw votes this row contributes (1 for free votes)
    pub quantity: i64,

    /// Calendar day of the vote in the voting timezone
    pub vote_day: Date,

    /// 0-based free-vote slot for the day; NULL for purchased credits.
    /// Unique per (competition, voter, day).
    #[sea_orm(nullable)]
    pub daily_slot: Option<i32>,

    #[sea_orm(nullable)]
    pub purchase_id: Option<String>,

    /// Referral code the voter arrived with
    #[sea_orm(nullable)]
    pub ref_code: Option<String>,

    pub voted_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contestant::Entity",
        from = "Column::ContestantId",
        to = "super::contestant::Column::Id",
        on_delete = "Cascade"
    )]
    Contestant,

    #[sea_orm(
        belongs_to = "super::competition::Entity",
        from = "Column::CompetitionId",
        to = "super::competition::Column::Id",
        on_delete = "Cascade"
    )]
    Competition,
}

impl Related<super::contestant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contestant.def()
    }
}

impl Related<super::competition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Competition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
