//! Contestant entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review status of a contestant's application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ApplicationStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contestant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub competition_id: String,

    /// User whose talent profile entered the competition
    #[sea_orm(indexed)]
    pub talent_profile_id: String,

    pub display_name: String,

    pub application_status: ApplicationStatus,

    /// Raw vote total (denormalized from the vote ledger)
    #[sea_orm(default_value = 0)]
    pub vote_count: i64,

    /// Raw online votes, free and purchased
    #[sea_orm(default_value = 0)]
    pub online_vote_count: i64,

    /// Raw in-person votes
    #[sea_orm(default_value = 0)]
    pub in_person_vote_count: i64,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Leaderboard score: in-person votes at full weight, online votes at
    /// `online_vote_weight` percent.
    #[must_use]
    pub fn weighted_score(&self, online_vote_weight: i32) -> f64 {
        let weight = f64::from(online_vote_weight.clamp(0, 100)) / 100.0;
        self.in_person_vote_count as f64 + self.online_vote_count as f64 * weight
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::competition::Entity",
        from = "Column::CompetitionId",
        to = "super::competition::Column::Id",
        on_delete = "Cascade"
    )]
    Competition,

    #[sea_orm(has_many = "super::vote::Entity")]
    Vote,
}

impl Related<super::competition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Competition.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
