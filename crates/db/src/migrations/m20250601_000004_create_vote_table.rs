//! Create vote ledger table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vote::ContestantId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::CompetitionId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::VoterKey).string_len(128).not_null())
                    .col(ColumnDef::new(Vote::VoterIp).string_len(64))
                    .col(ColumnDef::new(Vote::VoterUserId).string_len(32))
                    .col(ColumnDef::new(Vote::Source).string_len(16).not_null())
                    .col(ColumnDef::new(Vote::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Vote::Quantity)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Vote::VoteDay).date().not_null())
                    .col(ColumnDef::new(Vote::DailySlot).integer())
                    .col(ColumnDef::new(Vote::PurchaseId).string_len(32))
                    .col(ColumnDef::new(Vote::RefCode).string_len(64))
                    .col(
                        ColumnDef::new(Vote::VotedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Vote::Quantity).gt(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_contestant")
                            .from(Vote::Table, Vote::ContestantId)
                            .to(Contestant::Table, Contestant::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_competition")
                            .from(Vote::Table, Vote::CompetitionId)
                            .to(Competition::Table, Competition::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one free vote per slot per voter per day. Purchased
        // credits have a NULL slot and never collide.
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_daily_slot")
                    .table(Vote::Table)
                    .col(Vote::CompetitionId)
                    .col(Vote::VoterKey)
                    .col(Vote::VoteDay)
                    .col(Vote::DailySlot)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: contestant_id (ledger reconciliation)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_contestant_id")
                    .table(Vote::Table)
                    .col(Vote::ContestantId)
                    .to_owned(),
            )
            .await?;

        // Index: purchase_id
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_purchase_id")
                    .table(Vote::Table)
                    .col(Vote::PurchaseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    ContestantId,
    CompetitionId,
    VoterKey,
    VoterIp,
    VoterUserId,
    Source,
    Kind,
    Quantity,
    VoteDay,
    DailySlot,
    PurchaseId,
    RefCode,
    VotedAt,
}

#[derive(Iden)]
enum Contestant {
    Table,
    Id,
}

#[derive(Iden)]
enum Competition {
    Table,
    Id,
}
