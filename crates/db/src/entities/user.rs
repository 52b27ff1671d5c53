//! User entity.
//!
//! One row per identity-provider account, created the first time a token
//! for that account is seen.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Platform role of a user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum UserRole {
    /// Regular voter.
    #[sea_orm(string_value = "voter")]
    #[default]
    Voter,
    /// Runs their own competitions.
    #[sea_orm(string_value = "host")]
    Host,
    /// Manages the whole platform.
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl UserRole {
    /// Privilege rank, higher grants more.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Voter => 0,
            Self::Host => 1,
            Self::Admin => 2,
        }
    }

    /// Whether this role may create and manage competitions.
    #[must_use]
    pub const fn can_host(self) -> bool {
        self.rank() >= Self::Host.rank()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Identity provider subject (Firebase UID)
    #[sea_orm(unique)]
    pub firebase_uid: String,

    #[sea_orm(nullable)]
    pub email: Option<String>,

    /// Whether the identity provider has verified `email`
    pub email_verified: bool,

    #[sea_orm(nullable)]
    pub display_name: Option<String>,

    pub role: UserRole,

    pub created_at: DateTimeWithTimeZone,

    pub last_seen_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this user is a platform admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::competition::Entity")]
    Competition,
}

impl Related<super::competition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Competition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
