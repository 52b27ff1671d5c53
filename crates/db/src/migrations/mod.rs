//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_user_table;
mod m20250601_000002_create_competition_table;
mod m20250601_000003_create_contestant_table;
mod m20250601_000004_create_vote_table;
mod m20250601_000005_create_vote_package_table;
mod m20250601_000006_create_vote_purchase_table;
mod m20250601_000007_create_payment_audit_table;
mod m20250601_000008_create_invitation_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_user_table::Migration),
            Box::new(m20250601_000002_create_competition_table::Migration),
            Box::new(m20250601_000003_create_contestant_table::Migration),
            Box::new(m20250601_000004_create_vote_table::Migration),
            Box::new(m20250601_000005_create_vote_package_table::Migration),
            Box::new(m20250601_000006_create_vote_purchase_table::Migration),
            Box::new(m20250601_000007_create_payment_audit_table::Migration),
            Box::new(m20250601_000008_create_invitation_table::Migration),
        ]
    }
}
