//! Contestant repository.

use std::sync::Arc;

use crate::entities::{
    Contestant,
    contestant::{self, ApplicationStatus},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};
use talentvote_common::{AppError, AppResult};

/// Contestant repository for database operations.
#[derive(Clone)]
pub struct ContestantRepository {
    db: Arc<DatabaseConnection>,
}

impl ContestantRepository {
    /// Create a new contestant repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a contestant by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<contestant::Model>> {
        Contestant::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a contestant by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<contestant::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contestant not found: {id}")))
    }

    /// Find contestants by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<contestant::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        Contestant::find()
            .filter(contestant::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the entry a talent profile already has in a competition.
    pub async fn find_by_competition_and_profile(
        &self,
        competition_id: &str,
        talent_profile_id: &str,
    ) -> AppResult<Option<contestant::Model>> {
        Contestant::find()
            .filter(contestant::Column::CompetitionId.eq(competition_id))
            .filter(contestant::Column::TalentProfileId.eq(talent_profile_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List contestants of a competition, optionally by application status.
    pub async fn find_by_competition(
        &self,
        competition_id: &str,
        status: Option<ApplicationStatus>,
    ) -> AppResult<Vec<contestant::Model>> {
        let mut query = Contestant::find()
            .filter(contestant::Column::CompetitionId.eq(competition_id))
            .order_by_asc(contestant::Column::Id);

        if let Some(status) = status {
            query = query.filter(contestant::Column::ApplicationStatus.eq(status));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Approved contestants ordered by weighted score, highest first.
    ///
    /// Orders on `in_person * 100 + online * weight` so ties and ordering are
    /// exact integers; the fractional score is derived afterwards.
    pub async fn leaderboard(
        &self,
        competition_id: &str,
        online_vote_weight: i32,
        limit: u64,
    ) -> AppResult<Vec<contestant::Model>> {
        let weight = i64::from(online_vote_weight.clamp(0, 100));

        Contestant::find()
            .filter(contestant::Column::CompetitionId.eq(competition_id))
            .filter(contestant::Column::ApplicationStatus.eq(ApplicationStatus::Approved))
            .order_by(
                Expr::cust_with_values(
                    "in_person_vote_count * 100 + online_vote_count * $1",
                    [weight],
                ),
                Order::Desc,
            )
            .order_by_asc(contestant::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count contestants of a competition with the given application status.
    pub async fn count_by_status(
        &self,
        competition_id: &str,
        status: ApplicationStatus,
    ) -> AppResult<u64> {
        Contestant::find()
            .filter(contestant::Column::CompetitionId.eq(competition_id))
            .filter(contestant::Column::ApplicationStatus.eq(status))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new contestant.
    pub async fn create(&self, model: contestant::ActiveModel) -> AppResult<contestant::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a contestant.
    pub async fn update(&self, model: contestant::ActiveModel) -> AppResult<contestant::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
