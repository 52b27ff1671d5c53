//! Competition entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum CompetitionStatus {
    /// Being set up, not visible to voters.
    #[sea_orm(string_value = "draft")]
    #[default]
    Draft,
    /// Open: accepting applications and votes.
    #[sea_orm(string_value = "active")]
    Active,
    /// Final voting round.
    #[sea_orm(string_value = "voting")]
    Voting,
    /// Closed. Only corrective edits by admins.
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl CompetitionStatus {
    /// Whether votes (free or purchased) are accepted in this status.
    #[must_use]
    pub const fn accepts_votes(self) -> bool {
        matches!(self, Self::Active | Self::Voting)
    }

    /// Whether a host may move a competition from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active)
                | (Self::Active, Self::Voting)
                | (Self::Active | Self::Voting, Self::Completed)
        )
    }

    /// Lowercase name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Voting => "voting",
            Self::Completed => "completed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "competition")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning host (or the admin who created it)
    #[sea_orm(indexed)]
    pub host_id: String,

    pub title: String,

    pub category: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub status: CompetitionStatus,

    /// Price of one individually purchased vote, in cents
    pub vote_cost_cents: i64,

    /// Free-vote cap per voter per calendar day
    pub max_votes_per_day: i32,

    /// Percentage (0-100) an online vote counts for relative to an in-person vote
    pub online_vote_weight: i32,

    /// Only in-person (QR) votes are accepted
    pub in_person_only: bool,

    #[sea_orm(nullable)]
    pub start_date: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub end_date: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::HostId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    Host,

    #[sea_orm(has_many = "super::contestant::Entity")]
    Contestant,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Host.def()
    }
}

impl Related<super::contestant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contestant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
