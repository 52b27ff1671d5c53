//! Invitation entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::user::UserRole;

/// Status of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum InvitationStatus {
    /// Waiting for the invitee to register.
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// Invitee registered with the token.
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Passed `expires_at` while pending.
    #[sea_orm(string_value = "expired")]
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invitation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub token: String,

    #[sea_orm(indexed)]
    pub inviter_id: String,

    pub invitee_email: String,

    /// Role granted on acceptance
    pub target_level: UserRole,

    pub status: InvitationStatus,

    pub expires_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub accepted_by: Option<String>,

    #[sea_orm(nullable)]
    pub accepted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Status as seen at `now`: a pending invitation past its expiry reads as expired.
    #[must_use]
    pub fn effective_status(&self, now: DateTimeWithTimeZone) -> InvitationStatus {
        if self.status == InvitationStatus::Pending && self.expires_at <= now {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InviterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Inviter,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inviter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
