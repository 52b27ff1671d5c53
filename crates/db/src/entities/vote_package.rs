//! Vote package entity: a fixed bundle of votes sold at a fixed price.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote_package")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// NULL = offered in every competition
    #[sea_orm(indexed, nullable)]
    pub competition_id: Option<String>,

    pub name: String,

    pub vote_count: i32,

    #[sea_orm(default_value = 0)]
    pub bonus_votes: i32,

    pub price_cents: i64,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Votes credited for one purchase of this package.
    #[must_use]
    pub fn total_votes(&self) -> i64 {
        i64::from(self.vote_count) + i64::from(self.bonus_votes)
    }

    /// Whether this package can be bought for the given competition.
    #[must_use]
    pub fn is_offered_in(&self, competition_id: &str) -> bool {
        self.is_active
            && self
                .competition_id
                .as_deref()
                .is_none_or(|id| id == competition_id)
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
}

impl Related<super::competition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Competition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
