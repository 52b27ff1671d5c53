//! Business logic services.

#![allow(missing_docs)]

pub mod competition;
pub mod contestant;
pub mod eligibility;
pub mod email;
pub mod gateway;
pub mod invitation;
pub mod ledger;
pub mod package;
pub mod purchase;
pub mod recorder;
pub mod session;
pub mod voting;

#[cfg(test)]
pub(crate) mod testing;

pub use competition::{
    CompetitionService, CreateCompetitionInput, LeaderboardEntry, UpdateCompetitionInput,
};
pub use contestant::{ApplyInput, ContestantService};
pub use eligibility::{EligibilityService, EligibleVote, Voter, voting_day};
pub use email::{NoOpMailer, PurchaseReceipt, ReceiptLine, ReceiptMailer, SmtpReceiptMailer};
pub use gateway::{
    AuthorizeNetGateway, ChargeOutcome, ChargeRequest, PaymentGateway, clean_gateway_message,
};
pub use invitation::{CreateInvitationInput, InvitationService};
pub use ledger::{
    CompetitionAnalytics, ContestantBreakdown, LedgerService, PurchaseLookup, PurchaseSummary,
};
pub use package::{CreatePackageInput, VotePackageService};
pub use purchase::{
    CheckoutInput, CheckoutResult, PricedOrder, PurchaseAttempt, PurchaseService, PurchaseSettings,
    PurchaseStage,
};
pub use recorder::VoteRecorder;
pub use session::{FirebaseIdentityVerifier, IdentityClaims, IdentityVerifier, SessionService};
pub use voting::{CastVoteInput, CastVoteResult, VotingService};
