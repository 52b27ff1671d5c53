//! Purchase receipt emails.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use talentvote_common::{AppError, AppResult, Cents, config::EmailConfig};

/// One line of a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLine {
    pub description: String,
    pub votes: i64,
    pub amount: Cents,
}

/// Receipt for a completed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub to: String,
    pub buyer_name: String,
    pub items: Vec<ReceiptLine>,
    pub tax: Cents,
    pub total: Cents,
    pub currency: String,
    pub transaction_id: String,
    pub competition_name: String,
    pub contestant_name: String,
}

impl PurchaseReceipt {
    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("Your votes for {} in {}", self.contestant_name, self.competition_name)
    }

    /// Plain-text body.
    #[must_use]
    pub fn text_body(&self) -> String {
        let mut body = format!("Hi {},\n\nThanks for your purchase!\n\n", self.buyer_name);
        for item in &self.items {
            body += &format!(
                "  {} ({} votes)  {} {}\n",
                item.description, item.votes, item.amount, self.currency
            );
        }
        if self.tax > Cents::ZERO {
            body += &format!("  Tax  {} {}\n", self.tax, self.currency);
        }
        body += &format!(
            "\nTotal charged: {} {}\nContestant: {}\nCompetition: {}\nTransaction ID: {}\n",
            self.total,
            self.currency,
            self.contestant_name,
            self.competition_name,
            self.transaction_id
        );
        body += "\nKeep this email as your receipt.\n";
        body
    }
}

/// Sends purchase receipts.
#[async_trait]
pub trait ReceiptMailer: Send + Sync {
    async fn send_purchase_receipt(&self, receipt: &PurchaseReceipt) -> AppResult<()>;
}

/// Mailer used when email is disabled.
pub struct NoOpMailer;

#[async_trait]
impl ReceiptMailer for NoOpMailer {
    async fn send_purchase_receipt(&self, receipt: &PurchaseReceipt) -> AppResult<()> {
        tracing::debug!(
            transaction_id = %receipt.transaction_id,
            "Email disabled, receipt not sent"
        );
        Ok(())
    }
}

/// SMTP receipt mailer.
pub struct SmtpReceiptMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpReceiptMailer {
    /// Build a STARTTLS mailer from configuration.
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::Config(format!("Invalid SMTP relay: {e}")))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let address = config
            .from_address
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid sender address: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(Some(config.from_name.clone()), address),
        })
    }
}

#[async_trait]
impl ReceiptMailer for SmtpReceiptMailer {
    async fn send_purchase_receipt(&self, receipt: &PurchaseReceipt) -> AppResult<()> {
        let to = receipt
            .to
            .parse()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(receipt.buyer_name.clone()), to))
            .subject(receipt.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(receipt.text_body())
            .map_err(|e| AppError::Internal(format!("Failed to build receipt: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalService(format!("SMTP send failed: {e}")))?;

        tracing::info!(transaction_id = %receipt.transaction_id, "Sent purchase receipt");
        Ok(())
    }
}
