//! Vote package repository.

use std::sync::Arc;

use crate::entities::{VotePackage, vote_package};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use talentvote_common::{AppError, AppResult};

/// Vote package repository for database operations.
#[derive(Clone)]
pub struct VotePackageRepository {
    db: Arc<DatabaseConnection>,
}

impl VotePackageRepository {
    /// Create a new vote package repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a package by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<vote_package::Model>> {
        VotePackage::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a package by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<vote_package::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vote package not found: {id}")))
    }

    /// Active packages on sale for a competition, cheapest first.
    ///
    /// Includes platform-wide packages (no competition).
    pub async fn find_offered(&self, competition_id: &str) -> AppResult<Vec<vote_package::Model>> {
        VotePackage::find()
            .filter(vote_package::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(vote_package::Column::CompetitionId.eq(competition_id))
                    .add(vote_package::Column::CompetitionId.is_null()),
            )
            .order_by_asc(vote_package::Column::PriceCents)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new package.
    pub async fn create(&self, model: vote_package::ActiveModel) -> AppResult<vote_package::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a package.
    pub async fn update(&self, model: vote_package::ActiveModel) -> AppResult<vote_package::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
