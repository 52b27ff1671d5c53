//! Create vote package table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VotePackage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VotePackage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VotePackage::CompetitionId).string_len(32))
                    .col(ColumnDef::new(VotePackage::Name).string_len(128).not_null())
                    .col(ColumnDef::new(VotePackage::VoteCount).integer().not_null())
                    .col(
                        ColumnDef::new(VotePackage::BonusVotes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(VotePackage::PriceCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(VotePackage::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(VotePackage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(VotePackage::VoteCount).gt(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_package_competition")
                            .from(VotePackage::Table, VotePackage::CompetitionId)
                            .to(Competition::Table, Competition::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vote_package_competition_id")
                    .table(VotePackage::Table)
                    .col(VotePackage::CompetitionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VotePackage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum VotePackage {
    Table,
    Id,
    CompetitionId,
    Name,
    VoteCount,
    BonusVotes,
    PriceCents,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum Competition {
    Table,
    Id,
}
