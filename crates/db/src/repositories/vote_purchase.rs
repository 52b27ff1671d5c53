//! Vote purchase repository.
//!
//! Purchases are inserted by [`super::VoteRepository::record_purchase`]
//! together with their vote credit; this repository only reads them.

use std::sync::Arc;

use crate::entities::{VotePurchase, vote_purchase};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};
use talentvote_common::{AppError, AppResult};

/// Aggregate purchase figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromQueryResult)]
pub struct PurchaseTotals {
    pub purchases: i64,
    pub votes: Option<i64>,
    pub revenue_cents: Option<i64>,
    pub tax_cents: Option<i64>,
}

/// Purchases under an email and a name, both compared lowercased and the
/// name trimmed.
fn buyer_condition(email_lower: &str, name_lower: &str) -> Condition {
    Condition::all()
        .add(vote_purchase::Column::BuyerEmailLower.eq(email_lower))
        .add(Expr::cust_with_values(
            "LOWER(TRIM(buyer_name)) = $1",
            [name_lower],
        ))
}

/// Vote purchase repository for database operations.
#[derive(Clone)]
pub struct VotePurchaseRepository {
    db: Arc<DatabaseConnection>,
}

impl VotePurchaseRepository {
    /// Create a new vote purchase repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a purchase by gateway transaction ID.
    pub async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> AppResult<Option<vote_purchase::Model>> {
        VotePurchase::find()
            .filter(vote_purchase::Column::TransactionId.eq(transaction_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Purchases made under an email and name, newest first.
    ///
    /// Both arguments must already be lowercased, the name trimmed.
    pub async fn find_by_buyer(
        &self,
        email_lower: &str,
        name_lower: &str,
        limit: u64,
    ) -> AppResult<Vec<vote_purchase::Model>> {
        VotePurchase::find()
            .filter(buyer_condition(email_lower, name_lower))
            .order_by_desc(vote_purchase::Column::PurchasedAt)
            .order_by_desc(vote_purchase::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Purchases for a competition, newest first.
    pub async fn find_by_competition(
        &self,
        competition_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<vote_purchase::Model>> {
        let mut query = VotePurchase::find()
            .filter(vote_purchase::Column::CompetitionId.eq(competition_id))
            .order_by_desc(vote_purchase::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(vote_purchase::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Purchase count, votes credited and revenue for a competition.
    pub async fn totals_for_competition(&self, competition_id: &str) -> AppResult<PurchaseTotals> {
        self.totals(Condition::all().add(vote_purchase::Column::CompetitionId.eq(competition_id)))
            .await
    }

    /// Totals over every purchase [`Self::find_by_buyer`] matches, unlimited.
    pub async fn totals_for_buyer(
        &self,
        email_lower: &str,
        name_lower: &str,
    ) -> AppResult<PurchaseTotals> {
        self.totals(buyer_condition(email_lower, name_lower)).await
    }

    async fn totals(&self, condition: Condition) -> AppResult<PurchaseTotals> {
        let totals = VotePurchase::find()
            .filter(condition)
            .select_only()
            .column_as(Expr::cust("COUNT(*)"), "purchases")
            .column_as(Expr::cust("CAST(SUM(total_votes) AS BIGINT)"), "votes")
            .column_as(
                Expr::cust("CAST(SUM(amount_cents) AS BIGINT)"),
                "revenue_cents",
            )
            .column_as(Expr::cust("CAST(SUM(tax_cents) AS BIGINT)"), "tax_cents")
            .into_model::<PurchaseTotals>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(totals.unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn statements(db: Arc<DatabaseConnection>) -> String {
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        format!("{log:?}")
    }

    fn create_test_purchase(id: &str, txn: &str) -> vote_purchase::Model {
        vote_purchase::Model {
            id: id.to_string(),
            competition_id: "c1".to_string(),
            contestant_id: "k1".to_string(),
            buyer_user_id: None,
            buyer_name: "Pat".to_string(),
            buyer_email: "Pat@Example.com".to_string(),
            buyer_email_lower: "pat@example.com".to_string(),
            package_id: None,
            vote_count: 5,
            bonus_votes: 0,
            total_votes: 5,
            subtotal_cents: 500,
            tax_cents: 41,
            amount_cents: 541,
            currency: "USD".to_string(),
            transaction_id: txn.to_string(),
            referral_code: None,
            purchased_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_transaction_id() {
        let purchase = create_test_purchase("p1", "60000001");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[purchase.clone()]])
                .into_connection(),
        );

        let repo = VotePurchaseRepository::new(db);
        let found = repo.find_by_transaction_id("60000001").await.unwrap();

        assert_eq!(found.unwrap().id, "p1");
    }

    #[tokio::test]
    async fn test_find_by_buyer_matches_name_in_query() {
        let p1 = create_test_purchase("p2", "60000002");
        let p2 = create_test_purchase("p1", "60000001");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p1, p2]])
                .into_connection(),
        );

        let repo = VotePurchaseRepository::new(db.clone());
        let found = repo
            .find_by_buyer("pat@example.com", "pat", 100)
            .await
            .unwrap();
        drop(repo);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].transaction_id, "60000002");
        // The name is matched before LIMIT applies
        let sql = statements(db);
        let name_filter = sql.find("LOWER(TRIM(buyer_name)) = $").unwrap();
        assert!(name_filter < sql.find("LIMIT").unwrap());
    }

    #[tokio::test]
    async fn test_totals_for_buyer() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "purchases" => sea_orm::Value::BigInt(Some(250)),
                    "votes" => sea_orm::Value::BigInt(Some(2_500)),
                    "revenue_cents" => sea_orm::Value::BigInt(Some(270_625)),
                    "tax_cents" => sea_orm::Value::BigInt(Some(20_625)),
                }]])
                .into_connection(),
        );

        let repo = VotePurchaseRepository::new(db.clone());
        let totals = repo
            .totals_for_buyer("pat@example.com", "pat")
            .await
            .unwrap();
        drop(repo);

        assert_eq!(totals.purchases, 250);
        assert_eq!(totals.votes, Some(2_500));
        let sql = statements(db);
        assert!(sql.contains("LOWER(TRIM(buyer_name))"));
        assert!(sql.contains("COUNT(*)"));
    }

    #[tokio::test]
    async fn test_totals_for_competition() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "purchases" => sea_orm::Value::BigInt(Some(2)),
                    "votes" => sea_orm::Value::BigInt(Some(17)),
                    "revenue_cents" => sea_orm::Value::BigInt(Some(1_541)),
                    "tax_cents" => sea_orm::Value::BigInt(Some(41)),
                }]])
                .into_connection(),
        );

        let repo = VotePurchaseRepository::new(db);
        let totals = repo.totals_for_competition("c1").await.unwrap();

        assert_eq!(totals.purchases, 2);
        assert_eq!(totals.votes, Some(17));
        assert_eq!(totals.revenue_cents, Some(1_541));
    }
}
