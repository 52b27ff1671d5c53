//! Create contestant table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contestant::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contestant::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Contestant::CompetitionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contestant::TalentProfileId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contestant::DisplayName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contestant::ApplicationStatus)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Contestant::VoteCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Contestant::OnlineVoteCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Contestant::InPersonVoteCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Contestant::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contestant_competition")
                            .from(Contestant::Table, Contestant::CompetitionId)
                            .to(Competition::Table, Competition::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (competition_id, talent_profile_id) - one entry per performer
        manager
            .create_index(
                Index::create()
                    .name("idx_contestant_competition_profile")
                    .table(Contestant::Table)
                    .col(Contestant::CompetitionId)
                    .col(Contestant::TalentProfileId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contestant::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Contestant {
    Table,
    Id,
    CompetitionId,
    TalentProfileId,
    DisplayName,
    ApplicationStatus,
    VoteCount,
    OnlineVoteCount,
    InPersonVoteCount,
    CreatedAt,
}

#[derive(Iden)]
enum Competition {
    Table,
    Id,
}
