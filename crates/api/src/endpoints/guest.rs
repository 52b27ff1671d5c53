//! Guest checkout and purchase lookup. Neither needs an account.

use axum::{Json, Router, extract::State, middleware, routing::post};
use serde::{Deserialize, Serialize};
use talentvote_common::AppResult;
use talentvote_core::{CheckoutInput, PurchaseLookup};
use validator::Validate;

use crate::{
    extractors::RequestVoter,
    middleware::AppState,
    rate_limit::{RateLimiterState, rate_limit_write_middleware},
    response::ApiResponse,
};

// ==================== Request/Response Types ====================

/// Checkout request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub competition_id: String,
    pub contestant_id: String,
    pub package_id: Option<String>,
    pub individual_vote_count: Option<i64>,
    #[validate(length(min = 1))]
    pub data_descriptor: String,
    #[validate(length(min = 1))]
    pub data_value: String,
    #[validate(length(max = 64))]
    pub referral_code: Option<String>,
}

/// Checkout response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub purchase_id: String,
    pub transaction_id: String,
    pub contestant_id: String,
    pub votes_credited: i64,
    pub amount_cents: i64,
    pub tax_cents: i64,
    pub currency: String,
    pub already_processed: bool,
    pub receipt_sent: bool,
}

/// Lookup request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

// ==================== Handlers ====================

/// Buy votes with a tokenized card.
async fn checkout(
    RequestVoter(voter): RequestVoter,
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    req.validate()?;

    let result = state
        .purchase_service
        .checkout(CheckoutInput {
            buyer_name: req.name,
            buyer_email: req.email,
            voter,
            competition_id: req.competition_id,
            contestant_id: req.contestant_id,
            package_id: req.package_id,
            individual_vote_count: req.individual_vote_count,
            data_descriptor: req.data_descriptor,
            data_value: req.data_value,
            referral_code: req.referral_code,
        })
        .await?;

    let purchase = result.purchase;
    Ok(ApiResponse::ok(CheckoutResponse {
        purchase_id: purchase.id,
        transaction_id: purchase.transaction_id,
        contestant_id: purchase.contestant_id,
        votes_credited: purchase.total_votes,
        amount_cents: purchase.amount_cents,
        tax_cents: purchase.tax_cents,
        currency: purchase.currency,
        already_processed: result.already_processed,
        receipt_sent: result.receipt_sent,
    }))
}

/// Find past purchases by name and email.
async fn lookup(
    State(state): State<AppState>,
    Json(req): Json<LookupRequest>,
) -> AppResult<ApiResponse<PurchaseLookup>> {
    req.validate()?;
    let lookup = state.ledger_service.lookup(&req.name, &req.email).await?;
    Ok(ApiResponse::ok(lookup))
}

pub fn router(limiter: RateLimiterState) -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/lookup", post(lookup))
        .route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_write_middleware,
        ))
}
