//! ID and token generation.

use ulid::Ulid;
use uuid::Uuid;

/// Authorize.Net rejects invoice numbers longer than this.
const INVOICE_NUMBER_MAX: usize = 20;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new lowercase ULID, used as primary key for every table.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate an unguessable token for invitation links.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // No time component, unlike ULIDs
        Uuid::new_v4().simple().to_string()
    }

    /// Generate a gateway invoice number (uppercase ULID tail, 20 chars).
    #[must_use]
    pub fn generate_invoice_number(&self) -> String {
        let ulid = Ulid::new().to_string();
        ulid[ulid.len() - INVOICE_NUMBER_MAX..].to_string()
    }
}
