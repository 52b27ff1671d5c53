//! Payment gateway: exchanges an opaque card token for a captured charge.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::LazyLock;
use std::time::Duration;
use talentvote_common::{AppError, AppResult, Cents, config::PaymentConfig};

const SANDBOX_ENDPOINT: &str = "https://apitest.authorize.net/xml/v1/request.api";
const PRODUCTION_ENDPOINT: &str = "https://api.authorize.net/xml/v1/request.api";

const CHARGE_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client with request and connect timeouts.
pub(crate) fn http_client(
    timeout: Duration,
    connect_timeout: Duration,
) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {e}")))
}

/// Leading error codes like `E00027:`, `2 -` or `(TESTMODE)`.
#[allow(clippy::expect_used)]
static CODE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:\(TESTMODE\)|[A-Za-z]?\d+\b)\s*[:.\-)]?\s*)+")
        .expect("code prefix pattern is valid")
});

/// Strip leading numeric or error-code prefixes from a gateway message.
#[must_use]
pub fn clean_gateway_message(raw: &str) -> String {
    let cleaned = CODE_PREFIX.replace(raw, "").trim().to_string();
    if cleaned.is_empty() {
        "The payment was declined.".to_string()
    } else {
        cleaned
    }
}

/// A charge to submit.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount: Cents,
    pub currency: String,
    /// Accept.js `dataDescriptor`
    pub data_descriptor: String,
    /// Accept.js `dataValue` (single-use card token)
    pub data_value: String,
    pub invoice_number: String,
    pub description: String,
    pub customer_email: String,
}

/// A captured charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub transaction_id: String,
    pub auth_code: Option<String>,
    pub message: String,
}

/// Charges cards.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorize and capture in one step.
    ///
    /// A declined or rejected charge is `AppError::Payment` with a message
    /// fit to show the buyer; transport failures are `ExternalService`.
    async fn charge(&self, request: &ChargeRequest) -> AppResult<ChargeOutcome>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayResponse {
    #[serde(default)]
    transaction_response: Option<TransactionResponse>,
    messages: ResultMessages,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionResponse {
    #[serde(default)]
    response_code: Option<String>,
    #[serde(default)]
    auth_code: Option<String>,
    #[serde(default)]
    trans_id: Option<String>,
    #[serde(default)]
    messages: Vec<TransactionMessage>,
    #[serde(default)]
    errors: Vec<TransactionError>,
}

#[derive(Debug, Deserialize)]
struct TransactionMessage {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionError {
    #[serde(default)]
    error_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultMessages {
    result_code: String,
    #[serde(default)]
    message: Vec<ResultMessage>,
}

#[derive(Debug, Deserialize)]
struct ResultMessage {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MerchantAuthentication<'a> {
    name: &'a str,
    transaction_key: &'a str,
}

/// Authorize.Net JSON API gateway.
#[derive(Clone)]
pub struct AuthorizeNetGateway {
    api_login_id: String,
    transaction_key: String,
    endpoint: String,
    http: reqwest::Client,
}

impl AuthorizeNetGateway {
    /// Create a gateway from payment configuration.
    pub fn new(config: &PaymentConfig) -> AppResult<Self> {
        let endpoint = if config.sandbox {
            SANDBOX_ENDPOINT
        } else {
            PRODUCTION_ENDPOINT
        };
        Self::with_endpoint(config, endpoint.to_string())
    }

    /// Create a gateway that talks to a custom endpoint.
    pub fn with_endpoint(config: &PaymentConfig, endpoint: String) -> AppResult<Self> {
        Ok(Self {
            api_login_id: config.api_login_id.clone(),
            transaction_key: config.transaction_key.clone(),
            endpoint,
            http: http_client(CHARGE_TIMEOUT, CONNECT_TIMEOUT)?,
        })
    }

    fn request_body(&self, request: &ChargeRequest) -> serde_json::Value {
        json!({
            "createTransactionRequest": {
                "merchantAuthentication": MerchantAuthentication {
                    name: &self.api_login_id,
                    transaction_key: &self.transaction_key,
                },
                "transactionRequest": {
                    "transactionType": "authCaptureTransaction",
                    "amount": request.amount.to_decimal_string(),
                    "currencyCode": request.currency,
                    "payment": {
                        "opaqueData": {
                            "dataDescriptor": request.data_descriptor,
                            "dataValue": request.data_value,
                        }
                    },
                    "order": {
                        "invoiceNumber": request.invoice_number,
                        "description": request.description,
                    },
                    "customer": {
                        "email": request.customer_email,
                    }
                }
            }
        })
    }
}

/// Interpret a raw gateway response body.
fn parse_response(body: &str) -> AppResult<ChargeOutcome> {
    // The gateway prefixes its JSON with a UTF-8 byte order mark
    let body = body.trim_start_matches('\u{feff}');
    let response: GatewayResponse = serde_json::from_str(body)
        .map_err(|e| AppError::ExternalService(format!("Unreadable gateway response: {e}")))?;

    let txn = response.transaction_response;
    let approved = response.messages.result_code == "Ok"
        && txn
            .as_ref()
            .and_then(|t| t.response_code.as_deref())
            .is_some_and(|code| code == "1");

    if !approved {
        let raw = txn
            .as_ref()
            .and_then(|t| t.errors.first().map(|e| e.error_text.clone()))
            .or_else(|| response.messages.message.first().map(|m| m.text.clone()))
            .unwrap_or_default();
        return Err(AppError::Payment(clean_gateway_message(&raw)));
    }

    let txn = txn.ok_or_else(|| AppError::ExternalService("Missing transaction".to_string()))?;
    let transaction_id = txn
        .trans_id
        .filter(|id| !id.is_empty() && id != "0")
        .ok_or_else(|| {
            AppError::ExternalService("Approved charge without transaction ID".to_string())
        })?;

    Ok(ChargeOutcome {
        transaction_id,
        auth_code: txn.auth_code,
        message: txn
            .messages
            .first()
            .map(|m| m.description.clone())
            .unwrap_or_default(),
    })
}

#[async_trait]
impl PaymentGateway for AuthorizeNetGateway {
    async fn charge(&self, request: &ChargeRequest) -> AppResult<ChargeOutcome> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Gateway request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::ExternalService(format!("Gateway response failed: {e}")))?;

        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "Gateway returned HTTP {status}"
            )));
        }

        let outcome = parse_response(&body);
        match &outcome {
            Ok(charge) => tracing::info!(
                transaction_id = %charge.transaction_id,
                amount = %request.amount,
                invoice = %request.invoice_number,
                "Charge captured"
            ),
            Err(e) => tracing::info!(
                error = %e,
                invoice = %request.invoice_number,
                "Charge declined"
            ),
        }
        outcome
    }
}
