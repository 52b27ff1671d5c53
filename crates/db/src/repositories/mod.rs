//! Repositories: thin, typed access to each table.

use sea_orm::{DbErr, SqlErr};

mod competition;
mod contestant;
mod invitation;
mod payment_audit;
mod user;
mod vote;
mod vote_package;
mod vote_purchase;

pub use competition::CompetitionRepository;
pub use contestant::ContestantRepository;
pub use invitation::InvitationRepository;
pub use payment_audit::PaymentAuditRepository;
pub use user::UserRepository;
pub use vote::{SourceTally, VoteRepository};
pub use vote_package::VotePackageRepository;
pub use vote_purchase::{PurchaseTotals, VotePurchaseRepository};

/// Whether a database error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
