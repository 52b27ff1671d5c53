//! Create vote purchase table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VotePurchase::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VotePurchase::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VotePurchase::CompetitionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VotePurchase::ContestantId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(VotePurchase::BuyerUserId).string_len(32))
                    .col(ColumnDef::new(VotePurchase::BuyerName).string_len(256).not_null())
                    .col(
                        ColumnDef::new(VotePurchase::BuyerEmail)
                            .string_len(320)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VotePurchase::BuyerEmailLower)
                            .string_len(320)
                            .not_null(),
                    )
                    .col(ColumnDef::new(VotePurchase::PackageId).string_len(32))
                    .col(ColumnDef::new(VotePurchase::VoteCount).big_integer().not_null())
                    .col(
                        ColumnDef::new(VotePurchase::BonusVotes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(VotePurchase::TotalVotes).big_integer().not_null())
                    .col(
                        ColumnDef::new(VotePurchase::SubtotalCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(VotePurchase::TaxCents).big_integer().not_null())
                    .col(ColumnDef::new(VotePurchase::AmountCents).big_integer().not_null())
                    .col(ColumnDef::new(VotePurchase::Currency).string_len(3).not_null())
                    .col(
                        ColumnDef::new(VotePurchase::TransactionId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(VotePurchase::ReferralCode).string_len(64))
                    .col(
                        ColumnDef::new(VotePurchase::PurchasedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_purchase_competition")
                            .from(VotePurchase::Table, VotePurchase::CompetitionId)
                            .to(Competition::Table, Competition::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_purchase_contestant")
                            .from(VotePurchase::Table, VotePurchase::ContestantId)
                            .to(Contestant::Table, Contestant::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: buyer_email_lower (self-service lookup)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_purchase_buyer_email_lower")
                    .table(VotePurchase::Table)
                    .col(VotePurchase::BuyerEmailLower)
                    .to_owned(),
            )
            .await?;

        // Index: competition_id (analytics)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_purchase_competition_id")
                    .table(VotePurchase::Table)
                    .col(VotePurchase::CompetitionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VotePurchase::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum VotePurchase {
    Table,
    Id,
    CompetitionId,
    ContestantId,
    BuyerUserId,
    BuyerName,
    BuyerEmail,
    BuyerEmailLower,
    PackageId,
    VoteCount,
    BonusVotes,
    TotalVotes,
    SubtotalCents,
    TaxCents,
    AmountCents,
    Currency,
    TransactionId,
    ReferralCode,
    PurchasedAt,
}

#[derive(Iden)]
enum Competition {
    Table,
    Id,
}

#[derive(Iden)]
enum Contestant {
    Table,
    Id,
}
