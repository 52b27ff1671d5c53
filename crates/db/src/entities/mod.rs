//! Database entities.

#![allow(missing_docs)]

pub mod competition;
pub mod contestant;
pub mod invitation;
pub mod payment_audit;
pub mod user;
pub mod vote;
pub mod vote_package;
pub mod vote_purchase;

pub use competition::Entity as Competition;
pub use contestant::Entity as Contestant;
pub use invitation::Entity as Invitation;
pub use payment_audit::Entity as PaymentAudit;
pub use user::Entity as User;
pub use vote::Entity as Vote;
pub use vote_package::Entity as VotePackage;
pub use vote_purchase::Entity as VotePurchase;
