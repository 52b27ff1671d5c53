//! Competition repository.

use std::sync::Arc;

use crate::entities::{
    Competition,
    competition::{self, CompetitionStatus},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use talentvote_common::{AppError, AppResult};

/// Competition repository for database operations.
#[derive(Clone)]
pub struct CompetitionRepository {
    db: Arc<DatabaseConnection>,
}

impl CompetitionRepository {
    /// Create a new competition repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a competition by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<competition::Model>> {
        Competition::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a competition by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<competition::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Competition not found: {id}")))
    }

    /// Find competitions by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<competition::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        Competition::find()
            .filter(competition::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List competitions, newest first, optionally restricted to some statuses.
    ///
    /// Pagination uses an ID cursor (`until_id`).
    pub async fn list(
        &self,
        statuses: &[CompetitionStatus],
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<competition::Model>> {
        let mut query = Competition::find().order_by_desc(competition::Column::Id);

        if !statuses.is_empty() {
            query = query.filter(competition::Column::Status.is_in(statuses.iter().copied()));
        }
        if let Some(id) = until_id {
            query = query.filter(competition::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List competitions owned by a host.
    pub async fn find_by_host(&self, host_id: &str) -> AppResult<Vec<competition::Model>> {
        Competition::find()
            .filter(competition::Column::HostId.eq(host_id))
            .order_by_desc(competition::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new competition.
    pub async fn create(&self, model: competition::ActiveModel) -> AppResult<competition::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a competition.
    pub async fn update(&self, model: competition::ActiveModel) -> AppResult<competition::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
