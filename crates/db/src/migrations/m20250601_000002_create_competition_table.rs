//! Create competition table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Competition::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Competition::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Competition::HostId).string_len(32).not_null())
                    .col(ColumnDef::new(Competition::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Competition::Category).string_len(128).not_null())
                    .col(ColumnDef::new(Competition::Description).text())
                    .col(
                        ColumnDef::new(Competition::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(Competition::VoteCostCents)
                            .big_integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(Competition::MaxVotesPerDay)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Competition::OnlineVoteWeight)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(Competition::InPersonOnly)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Competition::StartDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Competition::EndDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Competition::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Competition::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Competition::OnlineVoteWeight).between(0, 100))
                    .check(Expr::col(Competition::MaxVotesPerDay).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_competition_host")
                            .from(Competition::Table, Competition::HostId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_competition_host_id")
                    .table(Competition::Table)
                    .col(Competition::HostId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_competition_status")
                    .table(Competition::Table)
                    .col(Competition::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Competition::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Competition {
    Table,
    Id,
    HostId,
    Title,
    Category,
    Description,
    Status,
    VoteCostCents,
    MaxVotesPerDay,
    OnlineVoteWeight,
    InPersonOnly,
    StartDate,
    EndDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
