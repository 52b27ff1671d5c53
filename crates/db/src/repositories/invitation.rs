//! Invitation repository.

use std::sync::Arc;

use crate::entities::{
    Invitation,
    invitation::{self, InvitationStatus},
    user::{self, UserRole},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, entity::prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use talentvote_common::{AppError, AppResult};

/// Invitation repository for database operations.
#[derive(Clone)]
pub struct InvitationRepository {
    db: Arc<DatabaseConnection>,
}

impl InvitationRepository {
    /// Create a new invitation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an invitation by its token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<invitation::Model>> {
        Invitation::find()
            .filter(invitation::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Invitations sent by a user, newest first.
    pub async fn find_by_inviter(&self, inviter_id: &str) -> AppResult<Vec<invitation::Model>> {
        Invitation::find()
            .filter(invitation::Column::InviterId.eq(inviter_id))
            .order_by_desc(invitation::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new invitation.
    pub async fn create(&self, model: invitation::ActiveModel) -> AppResult<invitation::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Persist a status change.
    pub async fn set_status(
        &self,
        invitation: invitation::Model,
        status: InvitationStatus,
    ) -> AppResult<invitation::Model> {
        let mut active: invitation::ActiveModel = invitation.into();
        active.status = Set(status);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Accept a pending invitation for `user`, raising the user to `role` when
    /// given. Both writes land in one transaction.
    ///
    /// Fails with `InvalidState` when the invitation is no longer pending in
    /// the database; nothing is written in that case.
    pub async fn accept(
        &self,
        invitation: invitation::Model,
        user: user::Model,
        role: Option<UserRole>,
    ) -> AppResult<(invitation::Model, user::Model)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let accepted_at: DateTimeWithTimeZone = Utc::now().into();
        let result = Invitation::update_many()
            .col_expr(
                invitation::Column::Status,
                Expr::value(InvitationStatus::Accepted),
            )
            .col_expr(invitation::Column::AcceptedBy, Expr::value(user.id.clone()))
            .col_expr(invitation::Column::AcceptedAt, Expr::value(accepted_at))
            .filter(invitation::Column::Id.eq(invitation.id.as_str()))
            .filter(invitation::Column::Status.eq(InvitationStatus::Pending))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected != 1 {
            return Err(AppError::InvalidState(
                "Invitation is no longer pending".to_string(),
            ));
        }

        let user = match role {
            Some(role) => {
                let mut active: user::ActiveModel = user.into();
                active.role = Set(role);
                active
                    .update(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?
            }
            None => user,
        };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let invitation = invitation::Model {
            status: InvitationStatus::Accepted,
            accepted_by: Some(user.id.clone()),
            accepted_at: Some(accepted_at),
            ..invitation
        };
        Ok((invitation, user))
    }
}
