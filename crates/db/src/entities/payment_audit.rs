//! Payment audit entity.
//!
//! Records charges the gateway captured but that could not be credited,
//! for manual reconciliation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_audit")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub transaction_id: String,

    pub competition_id: String,

    pub contestant_id: String,

    pub buyer_email: String,

    pub amount_cents: i64,

    /// Purchase stage reached when the gap occurred
    pub stage: String,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    /// Set once support has reconciled the charge
    #[sea_orm(nullable)]
    pub resolved_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
