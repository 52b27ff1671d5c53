//! Fakes and fixtures shared by service tests.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use talentvote_common::{AppError, AppResult};
use talentvote_db::entities::{
    competition::{self, CompetitionStatus},
    contestant::{self, ApplicationStatus},
    user::{self, UserRole},
    vote::{self, VoteKind, VoteSource},
    vote_package, vote_purchase,
};

use super::email::{PurchaseReceipt, ReceiptMailer};
use super::gateway::{ChargeOutcome, ChargeRequest, PaymentGateway};
use super::session::{IdentityClaims, IdentityVerifier};

/// Verifier that accepts every token as one fixed account, or rejects all.
pub struct StaticVerifier {
    uid: Option<String>,
}

impl StaticVerifier {
    pub fn accepting(uid: &str) -> Self {
        Self {
            uid: Some(uid.to_string()),
        }
    }

    pub const fn rejecting() -> Self {
        Self { uid: None }
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, _token: &str) -> AppResult<IdentityClaims> {
        let uid = self.uid.clone().ok_or(AppError::Unauthorized)?;
        Ok(IdentityClaims {
            uid,
            email: Some("fan@example.com".to_string()),
            email_verified: true,
            name: Some("Fan".to_string()),
        })
    }
}

/// Gateway that approves with a fixed transaction ID or declines.
pub struct FakeGateway {
    outcome: Result<String, String>,
    pub calls: AtomicUsize,
    pub last_amount: Mutex<Option<i64>>,
}

impl FakeGateway {
    pub fn approving(transaction_id: &str) -> Self {
        Self {
            outcome: Ok(transaction_id.to_string()),
            calls: AtomicUsize::new(0),
            last_amount: Mutex::new(None),
        }
    }

    pub fn declining(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_amount: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn charge(&self, request: &ChargeRequest) -> AppResult<ChargeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_amount.lock().unwrap() = Some(request.amount.get());
        match &self.outcome {
            Ok(transaction_id) => Ok(ChargeOutcome {
                transaction_id: transaction_id.clone(),
                auth_code: Some("ABC123".to_string()),
                message: "This transaction has been approved.".to_string(),
            }),
            Err(message) => Err(AppError::Payment(message.clone())),
        }
    }
}

/// Mailer that records receipts, optionally failing every send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<PurchaseReceipt>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl ReceiptMailer for RecordingMailer {
    async fn send_purchase_receipt(&self, receipt: &PurchaseReceipt) -> AppResult<()> {
        if self.fail {
            return Err(AppError::ExternalService("smtp down".to_string()));
        }
        self.sent.lock().unwrap().push(receipt.clone());
        Ok(())
    }
}

pub fn test_user(id: &str, role: UserRole) -> user::Model {
    user::Model {
        id: id.to_string(),
        firebase_uid: format!("fb-{id}"),
        email: Some(format!("{id}@example.com")),
        email_verified: true,
        display_name: Some(format!("User {id}")),
        role,
        created_at: Utc::now().into(),
        last_seen_at: Utc::now().into(),
    }
}

pub fn test_competition(id: &str, status: CompetitionStatus) -> competition::Model {
    competition::Model {
        id: id.to_string(),
        host_id: "host1".to_string(),
        title: "Summer Showcase".to_string(),
        category: "singing".to_string(),
        description: None,
        status,
        vote_cost_cents: 100,
        max_votes_per_day: 1,
        online_vote_weight: 100,
        in_person_only: false,
        start_date: None,
        end_date: None,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

pub fn test_contestant(id: &str, competition_id: &str) -> contestant::Model {
    contestant::Model {
        id: id.to_string(),
        competition_id: competition_id.to_string(),
        talent_profile_id: format!("profile-{id}"),
        display_name: format!("Act {id}"),
        application_status: ApplicationStatus::Approved,
        vote_count: 0,
        online_vote_count: 0,
        in_person_vote_count: 0,
        created_at: Utc::now().into(),
    }
}

pub fn test_package(id: &str, competition_id: Option<&str>) -> vote_package::Model {
    vote_package::Model {
        id: id.to_string(),
        competition_id: competition_id.map(str::to_string),
        name: "Fan Pack".to_string(),
        vote_count: 10,
        bonus_votes: 0,
        price_cents: 1000,
        is_active: true,
        created_at: Utc::now().into(),
    }
}

pub fn test_purchase(id: &str, transaction_id: &str, total_votes: i64) -> vote_purchase::Model {
    vote_purchase::Model {
        id: id.to_string(),
        competition_id: "c1".to_string(),
        contestant_id: "k1".to_string(),
        buyer_user_id: None,
        buyer_name: "Pat Doe".to_string(),
        buyer_email: "Pat@Example.com".to_string(),
        buyer_email_lower: "pat@example.com".to_string(),
        package_id: None,
        vote_count: total_votes,
        bonus_votes: 0,
        total_votes,
        subtotal_cents: total_votes * 100,
        tax_cents: 0,
        amount_cents: total_votes * 100,
        currency: "USD".to_string(),
        transaction_id: transaction_id.to_string(),
        referral_code: None,
        purchased_at: Utc::now().into(),
    }
}

pub fn test_vote(kind: VoteKind, quantity: i64, slot: Option<i32>) -> vote::Model {
    vote::Model {
        id: "v1".to_string(),
        contestant_id: "k1".to_string(),
        competition_id: "c1".to_string(),
        voter_key: "ip:203.0.113.9".to_string(),
        voter_ip: Some("203.0.113.9".to_string()),
        voter_user_id: None,
        source: VoteSource::Online,
        kind,
        quantity,
        vote_day: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        daily_slot: slot,
        purchase_id: None,
        ref_code: None,
        voted_at: Utc::now().into(),
    }
}

pub fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
    maplit::btreemap! {
        "num_items" => sea_orm::Value::BigInt(Some(n))
    }
}

pub const fn exec_ok(rows_affected: u64) -> sea_orm::MockExecResult {
    sea_orm::MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}
