//! Vote purchase ledger entity.
//!
//! Written exactly once per captured payment, never mutated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote_purchase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub competition_id: String,

    #[sea_orm(indexed)]
    pub contestant_id: String,

    #[sea_orm(nullable)]
    pub buyer_user_id: Option<String>,

    pub buyer_name: String,

    pub buyer_email: String,

    /// Lowercased email for self-service lookup
    #[sea_orm(indexed)]
    pub buyer_email_lower: String,

    #[sea_orm(nullable)]
    pub package_id: Option<String>,

    /// Base votes bought
    pub vote_count: i64,

    pub bonus_votes: i64,

    /// Votes credited (base + bonus)
    pub total_votes: i64,

    pub subtotal_cents: i64,

    pub tax_cents: i64,

    /// Amount charged (subtotal + tax)
    pub amount_cents: i64,

    pub currency: String,

    /// Gateway transaction ID
    #[sea_orm(unique)]
    pub transaction_id: String,

    #[sea_orm(nullable)]
    pub referral_code: Option<String>,

    pub purchased_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::competition::Entity",
        from = "Column::CompetitionId",
        to = "super::competition::Column::Id",
        on_delete = "Restrict"
    )]
    Competition,

    #[sea_orm(
        belongs_to = "super::contestant::Entity",
        from = "Column::ContestantId",
        to = "super::contestant::Column::Id",
        on_delete = "Restrict"
    )]
    Contestant,
}

impl Related<super::competition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Competition.def()
    }
}

impl Related<super::contestant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contestant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
