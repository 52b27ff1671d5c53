//! Vote purchases: charge a card token, then credit the votes.
//!
//! Each checkout is a [`PurchaseAttempt`] driven one stage at a time:
//!
//! ```text
//! Initiated -> TokenValidated -> Charged -> VotesCredited -> ReceiptSent
//!      \              \              \
//!       `--------------`--------------`--> Failed
//! ```
//!
//! `VotesCredited` is already a success; a receipt that cannot be sent only
//! logs a warning. A retry is always a new attempt.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::Set;
use talentvote_common::{AppError, AppResult, Cents, IdGenerator};
use talentvote_db::{
    entities::{competition, contestant, payment_audit, vote::VoteSource, vote_package, vote_purchase},
    repositories::{
        CompetitionRepository, ContestantRepository, PaymentAuditRepository,
        VotePackageRepository, VotePurchaseRepository,
    },
};
use validator::ValidateEmail;

use super::eligibility::{Voter, ensure_source_allowed, ensure_votable};
use super::email::{PurchaseReceipt, ReceiptLine, ReceiptMailer};
use super::gateway::{ChargeOutcome, ChargeRequest, PaymentGateway};
use super::recorder::VoteRecorder;

/// Receipts that take longer than this are abandoned.
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Gateway limit for order descriptions.
const DESCRIPTION_MAX: usize = 255;

/// Stages of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStage {
    Initiated,
    TokenValidated,
    Charged,
    VotesCredited,
    ReceiptSent,
}

impl PurchaseStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::TokenValidated => "token_validated",
            Self::Charged => "charged",
            Self::VotesCredited => "votes_credited",
            Self::ReceiptSent => "receipt_sent",
        }
    }
}

/// A validated, priced order.
#[derive(Debug, Clone)]
pub struct PricedOrder {
    pub competition: competition::Model,
    pub contestant: contestant::Model,
    pub package: Option<vote_package::Model>,
    pub vote_count: i64,
    pub bonus_votes: i64,
    pub subtotal: Cents,
    pub tax: Cents,
    pub total: Cents,
}

impl PricedOrder {
    #[must_use]
    pub const fn total_votes(&self) -> i64 {
        self.vote_count + self.bonus_votes
    }

    fn description(&self) -> String {
        let text = format!(
            "{} votes for {} ({})",
            self.total_votes(),
            self.contestant.display_name,
            self.competition.title
        );
        text.chars().take(DESCRIPTION_MAX).collect()
    }
}

/// State of one checkout.
#[derive(Debug)]
pub enum PurchaseAttempt {
    Initiated,
    TokenValidated(PricedOrder),
    Charged {
        order: PricedOrder,
        charge: ChargeOutcome,
    },
    VotesCredited {
        order: PricedOrder,
        purchase: vote_purchase::Model,
        already_processed: bool,
        receipt_attempted: bool,
    },
    ReceiptSent {
        purchase: vote_purchase::Model,
    },
    Failed {
        stage: PurchaseStage,
        error: AppError,
    },
}

impl PurchaseAttempt {
    /// Last stage reached.
    #[must_use]
    pub const fn stage(&self) -> PurchaseStage {
        match self {
            Self::Initiated => PurchaseStage::Initiated,
            Self::TokenValidated(_) => PurchaseStage::TokenValidated,
            Self::Charged { .. } => PurchaseStage::Charged,
            Self::VotesCredited { .. } => PurchaseStage::VotesCredited,
            Self::ReceiptSent { .. } => PurchaseStage::ReceiptSent,
            Self::Failed { stage, .. } => *stage,
        }
    }

    /// No further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ReceiptSent { .. }
                | Self::Failed { .. }
                | Self::VotesCredited {
                    receipt_attempted: true,
                    ..
                }
        )
    }

    fn into_result(self) -> AppResult<CheckoutResult> {
        match self {
            Self::ReceiptSent { purchase } => Ok(CheckoutResult {
                purchase,
                already_processed: false,
                receipt_sent: true,
            }),
            Self::VotesCredited {
                purchase,
                already_processed,
                ..
            } => Ok(CheckoutResult {
                purchase,
                already_processed,
                receipt_sent: false,
            }),
            Self::Failed { error, .. } => Err(error),
            other => Err(AppError::Internal(format!(
                "Checkout stopped at {}",
                other.stage().as_str()
            ))),
        }
    }
}

/// Checkout request.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub buyer_name: String,
    pub buyer_email: String,
    pub voter: Voter,
    pub competition_id: String,
    pub contestant_id: String,
    pub package_id: Option<String>,
    pub individual_vote_count: Option<i64>,
    pub data_descriptor: String,
    pub data_value: String,
    pub referral_code: Option<String>,
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutResult {
    pub purchase: vote_purchase::Model,
    /// The gateway transaction had already been credited; nothing new was added
    pub already_processed: bool,
    pub receipt_sent: bool,
}

/// Pricing and limits applied to every checkout.
#[derive(Debug, Clone)]
pub struct PurchaseSettings {
    pub currency: String,
    pub sales_tax_bps: i64,
    pub max_individual_votes: i64,
}

/// Purchase service.
#[derive(Clone)]
pub struct PurchaseService {
    competition_repo: CompetitionRepository,
    contestant_repo: ContestantRepository,
    package_repo: VotePackageRepository,
    purchase_repo: VotePurchaseRepository,
    audit_repo: PaymentAuditRepository,
    recorder: VoteRecorder,
    gateway: Arc<dyn PaymentGateway>,
    mailer: Arc<dyn ReceiptMailer>,
    settings: PurchaseSettings,
    id_gen: IdGenerator,
}

impl PurchaseService {
    /// Create a new purchase service.
    #[must_use]
    pub fn new(
        competition_repo: CompetitionRepository,
        contestant_repo: ContestantRepository,
        package_repo: VotePackageRepository,
        purchase_repo: VotePurchaseRepository,
        audit_repo: PaymentAuditRepository,
        recorder: VoteRecorder,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn ReceiptMailer>,
        settings: PurchaseSettings,
    ) -> Self {
        Self {
            competition_repo,
            contestant_repo,
            package_repo,
            purchase_repo,
            audit_repo,
            recorder,
            gateway,
            mailer,
            settings,
            id_gen: IdGenerator::new(),
        }
    }

    /// Run a checkout to completion.
    ///
    /// The work happens on its own task: if the caller goes away after the
    /// card is charged, the votes are still credited.
    pub async fn checkout(&self, input: CheckoutInput) -> AppResult<CheckoutResult> {
        let service = self.clone();
        tokio::spawn(async move { service.run(input).await })
            .await
            .map_err(|e| AppError::Internal(format!("Checkout task failed: {e}")))?
    }

    async fn run(&self, input: CheckoutInput) -> AppResult<CheckoutResult> {
        let mut attempt = PurchaseAttempt::Initiated;
        while !attempt.is_terminal() {
            attempt = self.advance(attempt, &input).await;
        }
        if let PurchaseAttempt::Failed { stage, error } = &attempt {
            tracing::debug!(stage = stage.as_str(), error = %error, "Checkout failed");
        }
        attempt.into_result()
    }

    /// Move an attempt one stage forward.
    pub async fn advance(&self, attempt: PurchaseAttempt, input: &CheckoutInput) -> PurchaseAttempt {
        match attempt {
            PurchaseAttempt::Initiated => match self.validate(input).await {
                Ok(order) => PurchaseAttempt::TokenValidated(order),
                Err(error) => PurchaseAttempt::Failed {
                    stage: PurchaseStage::Initiated,
                    error,
                },
            },
            PurchaseAttempt::TokenValidated(order) => {
                let request = self.charge_request(&order, input);
                match self.gateway.charge(&request).await {
                    Ok(charge) => PurchaseAttempt::Charged { order, charge },
                    Err(error) => PurchaseAttempt::Failed {
                        stage: PurchaseStage::TokenValidated,
                        error,
                    },
                }
            }
            PurchaseAttempt::Charged { order, charge } => {
                match self.credit(&order, &charge, input).await {
                    Ok((purchase, already_processed)) => PurchaseAttempt::VotesCredited {
                        order,
                        purchase,
                        already_processed,
                        // a repeated transaction already had its receipt
                        receipt_attempted: already_processed,
                    },
                    Err(error) => {
                        self.record_reconciliation_gap(&order, &charge, input, &error)
                            .await;
                        PurchaseAttempt::Failed {
                            stage: PurchaseStage::Charged,
                            error: AppError::Internal(format!(
                                "Payment {} was captured but votes were not credited",
                                charge.transaction_id
                            )),
                        }
                    }
                }
            }
            PurchaseAttempt::VotesCredited {
                order,
                purchase,
                already_processed,
                receipt_attempted: false,
            } => {
                if self.send_receipt(&order, &purchase).await {
                    PurchaseAttempt::ReceiptSent { purchase }
                } else {
                    PurchaseAttempt::VotesCredited {
                        order,
                        purchase,
                        already_processed,
                        receipt_attempted: true,
                    }
                }
            }
            terminal => terminal,
        }
    }

    async fn validate(&self, input: &CheckoutInput) -> AppResult<PricedOrder> {
        if input.buyer_name.trim().is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        if !input.buyer_email.validate_email() {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if input.data_descriptor.trim().is_empty() || input.data_value.trim().is_empty() {
            return Err(AppError::Validation("Payment token is required".to_string()));
        }

        match (&input.package_id, input.individual_vote_count) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(AppError::Validation(
                    "Choose either a vote package or a number of votes".to_string(),
                ));
            }
            (None, Some(count)) if !(1..=self.settings.max_individual_votes).contains(&count) => {
                return Err(AppError::Validation(format!(
                    "Vote count must be between 1 and {}",
                    self.settings.max_individual_votes
                )));
            }
            _ => {}
        }

        let competition = self.competition_repo.get_by_id(&input.competition_id).await?;
        let contestant = self.contestant_repo.get_by_id(&input.contestant_id).await?;
        ensure_votable(&competition, &contestant)?;
        ensure_source_allowed(&competition, VoteSource::Online)?;

        let (package, vote_count, bonus_votes, subtotal) = if let Some(package_id) =
            &input.package_id
        {
            let package = self.package_repo.get_by_id(package_id).await?;
            if !package.is_offered_in(&competition.id) {
                return Err(AppError::Validation(
                    "This vote package is not available for this competition".to_string(),
                ));
            }
            let (votes, bonus, price) = (
                i64::from(package.vote_count),
                i64::from(package.bonus_votes),
                Cents(package.price_cents),
            );
            (Some(package), votes, bonus, price)
        } else {
            let count = input.individual_vote_count.unwrap_or_default();
            let subtotal = Cents(competition.vote_cost_cents)
                .times(count)
                .ok_or_else(|| AppError::Validation("Order total is too large".to_string()))?;
            (None, count, 0, subtotal)
        };

        if subtotal <= Cents::ZERO {
            return Err(AppError::Validation("Nothing to charge for this order".to_string()));
        }
        let total = subtotal
            .tax_at(self.settings.sales_tax_bps)
            .and_then(|tax| subtotal.checked_add(tax).map(|total| (tax, total)));
        let Some((tax, total)) = total else {
            return Err(AppError::Validation("Order total is too large".to_string()));
        };

        Ok(PricedOrder {
            competition,
            contestant,
            package,
            vote_count,
            bonus_votes,
            subtotal,
            tax,
            total,
        })
    }

    fn charge_request(&self, order: &PricedOrder, input: &CheckoutInput) -> ChargeRequest {
        ChargeRequest {
            amount: order.total,
            currency: self.settings.currency.clone(),
            data_descriptor: input.data_descriptor.clone(),
            data_value: input.data_value.clone(),
            invoice_number: self.id_gen.generate_invoice_number(),
            description: order.description(),
            customer_email: input.buyer_email.trim().to_string(),
        }
    }

    /// Write the purchase and its votes, unless this transaction was already credited.
    async fn credit(
        &self,
        order: &PricedOrder,
        charge: &ChargeOutcome,
        input: &CheckoutInput,
    ) -> AppResult<(vote_purchase::Model, bool)> {
        if let Some(existing) = self
            .purchase_repo
            .find_by_transaction_id(&charge.transaction_id)
            .await?
        {
            tracing::warn!(
                transaction_id = %charge.transaction_id,
                purchase_id = %existing.id,
                "Transaction already credited"
            );
            return Ok((existing, true));
        }

        let now = Utc::now();
        let email = input.buyer_email.trim().to_string();
        let purchase = vote_purchase::ActiveModel {
            id: Set(self.id_gen.generate()),
            competition_id: Set(order.competition.id.clone()),
            contestant_id: Set(order.contestant.id.clone()),
            buyer_user_id: Set(input.voter.user_id().map(str::to_string)),
            buyer_name: Set(input.buyer_name.trim().to_string()),
            buyer_email_lower: Set(email.to_lowercase()),
            buyer_email: Set(email),
            package_id: Set(order.package.as_ref().map(|p| p.id.clone())),
            vote_count: Set(order.vote_count),
            bonus_votes: Set(order.bonus_votes),
            total_votes: Set(order.total_votes()),
            subtotal_cents: Set(order.subtotal.get()),
            tax_cents: Set(order.tax.get()),
            amount_cents: Set(order.total.get()),
            currency: Set(self.settings.currency.clone()),
            transaction_id: Set(charge.transaction_id.clone()),
            referral_code: Set(input.referral_code.clone()),
            purchased_at: Set(now.into()),
        };

        match self
            .recorder
            .record_purchase(
                purchase,
                &order.competition.id,
                &order.contestant.id,
                &input.voter,
                input.referral_code.clone(),
                now,
            )
            .await
        {
            Ok((purchase, _)) => Ok((purchase, false)),
            Err(AppError::Conflict(_)) => self
                .purchase_repo
                .find_by_transaction_id(&charge.transaction_id)
                .await?
                .map(|existing| (existing, true))
                .ok_or_else(|| {
                    AppError::Internal("Duplicate transaction vanished".to_string())
                }),
            Err(e) => Err(e),
        }
    }

    async fn record_reconciliation_gap(
        &self,
        order: &PricedOrder,
        charge: &ChargeOutcome,
        input: &CheckoutInput,
        error: &AppError,
    ) {
        tracing::error!(
            transaction_id = %charge.transaction_id,
            competition_id = %order.competition.id,
            contestant_id = %order.contestant.id,
            amount = %order.total,
            error = %error,
            "Charge captured but votes were not credited"
        );

        let entry = payment_audit::ActiveModel {
            id: Set(self.id_gen.generate()),
            transaction_id: Set(charge.transaction_id.clone()),
            competition_id: Set(order.competition.id.clone()),
            contestant_id: Set(order.contestant.id.clone()),
            buyer_email: Set(input.buyer_email.trim().to_string()),
            amount_cents: Set(order.total.get()),
            stage: Set(PurchaseStage::Charged.as_str().to_string()),
            reason: Set(error.to_string()),
            resolved_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        if let Err(e) = self.audit_repo.create(entry).await {
            tracing::error!(
                transaction_id = %charge.transaction_id,
                error = %e,
                "Failed to write payment audit entry"
            );
        }
    }

    /// Best effort; returns whether the receipt went out.
    async fn send_receipt(&self, order: &PricedOrder, purchase: &vote_purchase::Model) -> bool {
        let description = order
            .package
            .as_ref()
            .map_or_else(|| "Individual votes".to_string(), |p| p.name.clone());
        let receipt = PurchaseReceipt {
            to: purchase.buyer_email.clone(),
            buyer_name: purchase.buyer_name.clone(),
            items: vec![ReceiptLine {
                description,
                votes: purchase.total_votes,
                amount: Cents(purchase.subtotal_cents),
            }],
            tax: Cents(purchase.tax_cents),
            total: Cents(purchase.amount_cents),
            currency: purchase.currency.clone(),
            transaction_id: purchase.transaction_id.clone(),
            competition_name: order.competition.title.clone(),
            contestant_name: order.contestant.display_name.clone(),
        };

        match tokio::time::timeout(RECEIPT_TIMEOUT, self.mailer.send_purchase_receipt(&receipt))
            .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(transaction_id = %purchase.transaction_id, error = %e, "Receipt not sent");
                false
            }
            Err(_) => {
                tracing::warn!(transaction_id = %purchase.transaction_id, "Receipt timed out");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::{
        FakeGateway, RecordingMailer, exec_ok, test_competition, test_contestant, test_package,
        test_purchase, test_vote,
    };
    use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase};
    use talentvote_db::{
        entities::{competition::CompetitionStatus, vote::VoteKind},
        repositories::VoteRepository,
    };

    struct Harness {
        db: Arc<DatabaseConnection>,
        gateway: Arc<FakeGateway>,
        mailer: Arc<RecordingMailer>,
        service: PurchaseService,
    }

    impl Harness {
        fn new(db: MockDatabase, gateway: FakeGateway, mailer: RecordingMailer) -> Self {
            let db = Arc::new(db.into_connection());
            let gateway = Arc::new(gateway);
            let mailer = Arc::new(mailer);
            let service = PurchaseService::new(
                CompetitionRepository::new(db.clone()),
                ContestantRepository::new(db.clone()),
                VotePackageRepository::new(db.clone()),
                VotePurchaseRepository::new(db.clone()),
                PaymentAuditRepository::new(db.clone()),
                VoteRecorder::new(VoteRepository::new(db.clone()), chrono_tz::UTC),
                gateway.clone(),
                mailer.clone(),
                PurchaseSettings {
                    currency: "USD".to_string(),
                    sales_tax_bps: 825,
                    max_individual_votes: 10_000,
                },
            );
            Self {
                db,
                gateway,
                mailer,
                service,
            }
        }

        /// SQL statements executed, once the service is gone.
        fn statements(self) -> Vec<String> {
            drop(self.service);
            let conn = Arc::try_unwrap(self.db).ok().unwrap();
            conn.into_transaction_log()
                .iter()
                .map(|t| format!("{t:?}"))
                .collect()
        }
    }

    fn package_input() -> CheckoutInput {
        CheckoutInput {
            buyer_name: "Pat Doe".to_string(),
            buyer_email: "Pat@Example.com".to_string(),
            voter: Voter::Anonymous {
                ip: "198.51.100.7".to_string(),
            },
            competition_id: "c1".to_string(),
            contestant_id: "k1".to_string(),
            package_id: Some("pk1".to_string()),
            individual_vote_count: None,
            data_descriptor: "COMMON.ACCEPT.INAPP.PAYMENT".to_string(),
            data_value: "opaque-token".to_string(),
            referral_code: None,
        }
    }

    fn open_order_rows(db: MockDatabase) -> MockDatabase {
        let mut package = test_package("pk1", Some("c1"));
        package.bonus_votes = 2;
        db.append_query_results([[test_competition("c1", CompetitionStatus::Voting)]])
            .append_query_results([[test_contestant("k1", "c1")]])
            .append_query_results([[package]])
    }

    #[tokio::test]
    async fn test_package_purchase_credits_votes_and_bonus() {
        let mut purchase = test_purchase("p1", "60000001", 12);
        purchase.vote_count = 10;
        purchase.bonus_votes = 2;
        purchase.subtotal_cents = 1000;
        purchase.tax_cents = 83;
        purchase.amount_cents = 1083;
        let mut credit = test_vote(VoteKind::Purchased, 12, None);
        credit.purchase_id = Some("p1".to_string());

        let db = open_order_rows(MockDatabase::new(DatabaseBackend::Postgres))
            .append_query_results([Vec::<vote_purchase::Model>::new()])
            .append_query_results([[purchase]])
            .append_query_results([[credit]])
            .append_exec_results([exec_ok(1)]);
        let harness = Harness::new(
            db,
            FakeGateway::approving("60000001"),
            RecordingMailer::default(),
        );

        let result = harness.service.checkout(package_input()).await.unwrap();

        assert_eq!(result.purchase.total_votes, 12);
        assert_eq!(result.purchase.transaction_id, "60000001");
        assert!(!result.already_processed);
        assert!(result.receipt_sent);
        assert_eq!(harness.gateway.call_count(), 1);
        assert_eq!(*harness.gateway.last_amount.lock().unwrap(), Some(1083));
        assert_eq!(harness.mailer.sent.lock().unwrap()[0].total, Cents(1083));
    }

    #[tokio::test]
    async fn test_declined_charge_writes_nothing() {
        let db = open_order_rows(MockDatabase::new(DatabaseBackend::Postgres));
        let harness = Harness::new(
            db,
            FakeGateway::declining("This transaction has been declined."),
            RecordingMailer::default(),
        );

        let result = harness.service.checkout(package_input()).await;

        assert!(matches!(
            result,
            Err(AppError::Payment(ref m)) if m == "This transaction has been declined."
        ));
        assert!(harness.mailer.sent.lock().unwrap().is_empty());
        let statements = harness.statements();
        assert!(statements.iter().all(|s| !s.contains("INSERT")));
    }

    #[tokio::test]
    async fn test_repeated_transaction_returns_existing_purchase() {
        let existing = test_purchase("p0", "60000001", 12);
        let db = open_order_rows(MockDatabase::new(DatabaseBackend::Postgres))
            .append_query_results([[existing]]);
        let harness = Harness::new(
            db,
            FakeGateway::approving("60000001"),
            RecordingMailer::default(),
        );

        let result = harness.service.checkout(package_input()).await.unwrap();

        assert!(result.already_processed);
        assert!(!result.receipt_sent);
        assert_eq!(result.purchase.id, "p0");
        let statements = harness.statements();
        assert!(statements.iter().all(|s| !s.contains("INSERT")));
    }

    #[tokio::test]
    async fn test_credit_failure_after_charge_is_audited() {
        let audit = payment_audit::Model {
            id: "a1".to_string(),
            transaction_id: "60000001".to_string(),
            competition_id: "c1".to_string(),
            contestant_id: "k1".to_string(),
            buyer_email: "Pat@Example.com".to_string(),
            amount_cents: 1083,
            stage: "charged".to_string(),
            reason: "Database error: connection reset".to_string(),
            resolved_at: None,
            created_at: Utc::now().into(),
        };
        let db = open_order_rows(MockDatabase::new(DatabaseBackend::Postgres))
            .append_query_results([Vec::<vote_purchase::Model>::new()])
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .append_query_results([[audit]]);
        let harness = Harness::new(
            db,
            FakeGateway::approving("60000001"),
            RecordingMailer::default(),
        );

        let result = harness.service.checkout(package_input()).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(harness.mailer.sent.lock().unwrap().is_empty());
        let statements = harness.statements();
        assert!(statements.iter().any(|s| s.contains("payment_audit")));
    }

    #[tokio::test]
    async fn test_receipt_failure_is_still_success() {
        let purchase = test_purchase("p1", "60000002", 12);
        let db = open_order_rows(MockDatabase::new(DatabaseBackend::Postgres))
            .append_query_results([Vec::<vote_purchase::Model>::new()])
            .append_query_results([[purchase]])
            .append_query_results([[test_vote(VoteKind::Purchased, 12, None)]])
            .append_exec_results([exec_ok(1)]);
        let harness = Harness::new(
            db,
            FakeGateway::approving("60000002"),
            RecordingMailer::failing(),
        );

        let result = harness.service.checkout(package_input()).await.unwrap();

        assert!(!result.receipt_sent);
        assert_eq!(result.purchase.total_votes, 12);
    }

    #[tokio::test]
    async fn test_package_and_count_together_rejected() {
        let mut input = package_input();
        input.individual_vote_count = Some(5);
        let harness = Harness::new(
            MockDatabase::new(DatabaseBackend::Postgres),
            FakeGateway::approving("60000001"),
            RecordingMailer::default(),
        );

        let result = harness.service.checkout(input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(harness.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_individual_count_bounds() {
        for count in [0, 10_001] {
            let mut input = package_input();
            input.package_id = None;
            input.individual_vote_count = Some(count);
            let harness = Harness::new(
                MockDatabase::new(DatabaseBackend::Postgres),
                FakeGateway::approving("60000001"),
                RecordingMailer::default(),
            );

            let result = harness.service.checkout(input).await;

            assert!(matches!(result, Err(AppError::Validation(_))));
            assert_eq!(harness.gateway.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_closed_competition_is_not_charged() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_competition("c1", CompetitionStatus::Completed)]])
            .append_query_results([[test_contestant("k1", "c1")]]);
        let harness = Harness::new(
            db,
            FakeGateway::approving("60000001"),
            RecordingMailer::default(),
        );

        let result = harness.service.checkout(package_input()).await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
        assert_eq!(harness.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_package_price_is_not_charged() {
        let mut package = test_package("pk1", Some("c1"));
        package.price_cents = 1_000_000_000_000_000_000;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_competition("c1", CompetitionStatus::Voting)]])
            .append_query_results([[test_contestant("k1", "c1")]])
            .append_query_results([[package]]);
        let harness = Harness::new(
            db,
            FakeGateway::approving("60000001"),
            RecordingMailer::default(),
        );

        let result = harness.service.checkout(package_input()).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(harness.gateway.call_count(), 0);
    }

    #[test]
    fn test_attempt_stages() {
        let failed = PurchaseAttempt::Failed {
            stage: PurchaseStage::TokenValidated,
            error: AppError::Payment("declined".to_string()),
        };
        assert!(failed.is_terminal());
        assert_eq!(failed.stage(), PurchaseStage::TokenValidated);
        assert!(!PurchaseAttempt::Initiated.is_terminal());
    }
}
