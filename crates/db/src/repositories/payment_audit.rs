//! Payment audit repository.

use std::sync::Arc;

use crate::entities::{PaymentAudit, payment_audit};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use talentvote_common::{AppError, AppResult};

/// Payment audit repository for database operations.
#[derive(Clone)]
pub struct PaymentAuditRepository {
    db: Arc<DatabaseConnection>,
}

impl PaymentAuditRepository {
    /// Create a new payment audit repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record an unreconciled charge.
    pub async fn create(
        &self,
        model: payment_audit::ActiveModel,
    ) -> AppResult<payment_audit::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Charges still waiting for reconciliation, oldest first.
    pub async fn find_unresolved(&self) -> AppResult<Vec<payment_audit::Model>> {
        PaymentAudit::find()
            .filter(payment_audit::Column::ResolvedAt.is_null())
            .order_by_asc(payment_audit::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark an audit entry as reconciled.
    pub async fn resolve(&self, id: &str) -> AppResult<payment_audit::Model> {
        let entry = PaymentAudit::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Payment audit not found: {id}")))?;

        let mut active: payment_audit::ActiveModel = entry.into();
        active.resolved_at = Set(Some(Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
