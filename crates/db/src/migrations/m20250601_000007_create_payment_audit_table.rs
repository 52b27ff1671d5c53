//! Create payment audit table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentAudit::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentAudit::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PaymentAudit::TransactionId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentAudit::CompetitionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentAudit::ContestantId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentAudit::BuyerEmail)
                            .string_len(320)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentAudit::AmountCents).big_integer().not_null())
                    .col(ColumnDef::new(PaymentAudit::Stage).string_len(32).not_null())
                    .col(ColumnDef::new(PaymentAudit::Reason).text().not_null())
                    .col(ColumnDef::new(PaymentAudit::ResolvedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PaymentAudit::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_audit_transaction_id")
                    .table(PaymentAudit::Table)
                    .col(PaymentAudit::TransactionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentAudit::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PaymentAudit {
    Table,
    Id,
    TransactionId,
    CompetitionId,
    ContestantId,
    BuyerEmail,
    AmountCents,
    Stage,
    Reason,
    ResolvedAt,
    CreatedAt,
}
