//! Vote ledger repository.
//!
//! Every write here appends ledger rows and bumps the contestant counters in
//! the same transaction, so the counters always equal the ledger sum.

use std::sync::Arc;

use super::is_unique_violation;
use crate::entities::{
    Contestant, Vote, contestant,
    vote::{self, VoteKind, VoteSource},
    vote_purchase,
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait,
    sea_query::Expr,
};
use talentvote_common::{AppError, AppResult};

/// Raw vote total for one (source, kind) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTally {
    pub source: VoteSource,
    pub kind: VoteKind,
    pub total: i64,
}

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Count free votes a voter has cast in a competition on a given day.
    pub async fn count_free_votes_on_day(
        &self,
        competition_id: &str,
        voter_key: &str,
        day: NaiveDate,
    ) -> AppResult<u64> {
        Self::free_votes_on_day(self.db.as_ref(), competition_id, voter_key, day).await
    }

    async fn free_votes_on_day<C: ConnectionTrait>(
        conn: &C,
        competition_id: &str,
        voter_key: &str,
        day: NaiveDate,
    ) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::CompetitionId.eq(competition_id))
            .filter(vote::Column::VoterKey.eq(voter_key))
            .filter(vote::Column::VoteDay.eq(day))
            .filter(vote::Column::Kind.eq(VoteKind::Free))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Append a free vote and credit the contestant, atomically.
    ///
    /// The vote takes the next free slot for its (competition, voter, day).
    /// Fails with `RateLimited` when every slot below `daily_cap` is taken,
    /// including when a concurrent request claims the same slot first.
    pub async fn record_free_vote(
        &self,
        mut model: vote::ActiveModel,
        daily_cap: i32,
    ) -> AppResult<vote::Model> {
        let competition_id = active_string(&model.competition_id)?;
        let voter_key = active_string(&model.voter_key)?;
        let day = match &model.vote_day {
            sea_orm::ActiveValue::Set(day) | sea_orm::ActiveValue::Unchanged(day) => *day,
            sea_orm::ActiveValue::NotSet => {
                return Err(AppError::Internal("vote_day not set".to_string()));
            }
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let used = Self::free_votes_on_day(&txn, &competition_id, &voter_key, day).await?;
        let cap = u64::try_from(daily_cap.max(0)).unwrap_or(0);
        if used >= cap {
            return Err(daily_cap_error(daily_cap));
        }

        model.kind = Set(VoteKind::Free);
        model.quantity = Set(1);
        model.daily_slot = Set(Some(i32::try_from(used).unwrap_or(i32::MAX)));

        let inserted = model.insert(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                daily_cap_error(daily_cap)
            } else {
                AppError::Database(e.to_string())
            }
        })?;

        Self::credit_contestant(&txn, &inserted.contestant_id, inserted.source, 1).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted)
    }

    /// Write a purchase and its vote credit, atomically.
    ///
    /// Fails with `Conflict` when a purchase for the same gateway transaction
    /// already exists; nothing is credited in that case.
    pub async fn record_purchase(
        &self,
        purchase: vote_purchase::ActiveModel,
        mut credit: vote::ActiveModel,
    ) -> AppResult<(vote_purchase::Model, vote::Model)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let purchase = purchase.insert(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Transaction already credited".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })?;

        credit.kind = Set(VoteKind::Purchased);
        credit.quantity = Set(purchase.total_votes);
        credit.daily_slot = Set(None);
        credit.purchase_id = Set(Some(purchase.id.clone()));

        let vote = credit
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::credit_contestant(&txn, &vote.contestant_id, vote.source, vote.quantity).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((purchase, vote))
    }

    async fn credit_contestant<C: ConnectionTrait>(
        conn: &C,
        contestant_id: &str,
        source: VoteSource,
        quantity: i64,
    ) -> AppResult<()> {
        let source_column = match source {
            VoteSource::Online => contestant::Column::OnlineVoteCount,
            VoteSource::InPerson => contestant::Column::InPersonVoteCount,
        };

        let result = Contestant::update_many()
            .col_expr(
                contestant::Column::VoteCount,
                Expr::col(contestant::Column::VoteCount).add(quantity),
            )
            .col_expr(source_column, Expr::col(source_column).add(quantity))
            .filter(contestant::Column::Id.eq(contestant_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "Contestant not found: {contestant_id}"
            )));
        }
        Ok(())
    }

    /// Sum of ledger quantities for a contestant.
    pub async fn sum_for_contestant(&self, contestant_id: &str) -> AppResult<i64> {
        #[derive(FromQueryResult)]
        struct SumResult {
            total: Option<i64>,
        }

        let result = Vote::find()
            .filter(vote::Column::ContestantId.eq(contestant_id))
            .select_only()
            .column_as(Expr::cust("CAST(SUM(quantity) AS BIGINT)"), "total")
            .into_model::<SumResult>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.and_then(|r| r.total).unwrap_or(0))
    }

    /// Raw vote totals of a competition grouped by source and kind.
    pub async fn tally_by_source(&self, competition_id: &str) -> AppResult<Vec<SourceTally>> {
        let rows = Vote::find()
            .filter(vote::Column::CompetitionId.eq(competition_id))
            .select_only()
            .column(vote::Column::Source)
            .column(vote::Column::Kind)
            .column_as(Expr::cust("CAST(SUM(quantity) AS BIGINT)"), "total")
            .group_by(vote::Column::Source)
            .group_by(vote::Column::Kind)
            .into_tuple::<(VoteSource, VoteKind, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(source, kind, total)| SourceTally {
                source,
                kind,
                total,
            })
            .collect())
    }

    /// Number of distinct voters who cast a free vote in a competition.
    pub async fn count_unique_voters(&self, competition_id: &str) -> AppResult<i64> {
        let count = Vote::find()
            .filter(vote::Column::CompetitionId.eq(competition_id))
            .filter(vote::Column::Kind.eq(VoteKind::Free))
            .select_only()
            .column_as(Expr::cust("COUNT(DISTINCT voter_key)"), "count")
            .into_tuple::<i64>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count.unwrap_or(0))
    }
}

fn active_string(value: &sea_orm::ActiveValue<String>) -> AppResult<String> {
    match value {
        sea_orm::ActiveValue::Set(v) | sea_orm::ActiveValue::Unchanged(v) => Ok(v.clone()),
        sea_orm::ActiveValue::NotSet => Err(AppError::Internal(
            "vote is missing competition or voter".to_string(),
        )),
    }
}

fn daily_cap_error(daily_cap: i32) -> AppError {
    AppError::RateLimited(format!(
        "You have reached the limit of {daily_cap} free vote(s) for today"
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{ActiveValue::NotSet, DatabaseBackend, MockDatabase, MockExecResult};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn new_vote(source: VoteSource) -> vote::ActiveModel {
        vote::ActiveModel {
            id: Set("v1".to_string()),
            contestant_id: Set("k1".to_string()),
            competition_id: Set("c1".to_string()),
            voter_key: Set("ip:203.0.113.9".to_string()),
            voter_ip: Set(Some("203.0.113.9".to_string())),
            voter_user_id: Set(None),
            source: Set(source),
            kind: NotSet,
            quantity: NotSet,
            vote_day: Set(day()),
            daily_slot: NotSet,
            purchase_id: Set(None),
            ref_code: Set(None),
            voted_at: Set(Utc::now().into()),
        }
    }

    fn stored_vote(slot: Option<i32>, kind: VoteKind, quantity: i64) -> vote::Model {
        vote::Model {
            id: "v1".to_string(),
            contestant_id: "k1".to_string(),
            competition_id: "c1".to_string(),
            voter_key: "ip:203.0.113.9".to_string(),
            voter_ip: Some("203.0.113.9".to_string()),
            voter_user_id: None,
            source: VoteSource::Online,
            kind,
            quantity,
            vote_day: day(),
            daily_slot: slot,
            purchase_id: None,
            ref_code: None,
            voted_at: Utc::now().into(),
        }
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! {
            "num_items" => sea_orm::Value::BigInt(Some(n))
        }
    }

    #[tokio::test]
    async fn test_record_free_vote_takes_next_slot() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .append_query_results([[stored_vote(Some(0), VoteKind::Free, 1)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let vote = repo
            .record_free_vote(new_vote(VoteSource::Online), 1)
            .await
            .unwrap();

        assert_eq!(vote.daily_slot, Some(0));
        assert_eq!(vote.kind, VoteKind::Free);
    }

    #[tokio::test]
    async fn test_record_free_vote_at_cap_is_rate_limited() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo.record_free_vote(new_vote(VoteSource::Online), 1).await;

        assert!(matches!(result, Err(AppError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_record_free_vote_unknown_contestant() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .append_query_results([[stored_vote(Some(0), VoteKind::Free, 1)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo.record_free_vote(new_vote(VoteSource::Online), 1).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_record_purchase_credits_total_votes() {
        let purchase = vote_purchase::Model {
            id: "p1".to_string(),
            competition_id: "c1".to_string(),
            contestant_id: "k1".to_string(),
            buyer_user_id: None,
            buyer_name: "Pat".to_string(),
            buyer_email: "Pat@Example.com".to_string(),
            buyer_email_lower: "pat@example.com".to_string(),
            package_id: None,
            vote_count: 10,
            bonus_votes: 2,
            total_votes: 12,
            subtotal_cents: 1000,
            tax_cents: 0,
            amount_cents: 1000,
            currency: "USD".to_string(),
            transaction_id: "60012345".to_string(),
            referral_code: None,
            purchased_at: Utc::now().into(),
        };
        let mut credited = stored_vote(None, VoteKind::Purchased, 12);
        credited.purchase_id = Some("p1".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[purchase.clone()]])
                .append_query_results([[credited]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let purchase_model: vote_purchase::ActiveModel = purchase.into();
        let (stored, vote) = repo
            .record_purchase(purchase_model, new_vote(VoteSource::Online))
            .await
            .unwrap();

        assert_eq!(stored.transaction_id, "60012345");
        assert_eq!(vote.quantity, 12);
        assert_eq!(vote.daily_slot, None);
        assert_eq!(vote.purchase_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_sum_for_contestant_empty_is_zero() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "total" => sea_orm::Value::BigInt(None)
                }]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        assert_eq!(repo.sum_for_contestant("k1").await.unwrap(), 0);
    }
}
