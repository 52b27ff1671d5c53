//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use talentvote_common::{AppError, AppResult};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {id}")))
    }

    /// Find a user by identity-provider UID.
    pub async fn find_by_firebase_uid(&self, uid: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::FirebaseUid.eq(uid))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Refresh profile fields and `last_seen_at` from a fresh identity token.
    pub async fn touch(
        &self,
        user: user::Model,
        email: Option<String>,
        email_verified: bool,
        display_name: Option<String>,
    ) -> AppResult<user::Model> {
        let mut active: user::ActiveModel = user.into();
        if email.is_some() {
            active.email = Set(email);
            active.email_verified = Set(email_verified);
        }
        if display_name.is_some() {
            active.display_name = Set(display_name);
        }
        active.last_seen_at = Set(Utc::now().into());
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
