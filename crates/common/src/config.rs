//! Application configuration.

use chrono_tz::Tz;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Voting rules configuration.
    #[serde(default)]
    pub voting: VotingConfig,
    /// Payment gateway configuration.
    pub payment: PaymentConfig,
    /// Outgoing email configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Identity provider configuration.
    pub identity: IdentityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
    /// Reverse proxies whose `X-Forwarded-For` / `X-Real-IP` headers are
    /// believed. Empty means the peer address is always the client.
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Voting rules shared by all competitions.
#[derive(Debug, Clone, Deserialize)]
pub struct VotingConfig {
    /// IANA timezone whose calendar day bounds the free-vote cap.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Free-vote cap used when a competition does not set its own.
    #[serde(default = "default_max_votes_per_day")]
    pub default_max_votes_per_day: i32,
    /// Upper bound for an individual (non-package) vote purchase.
    #[serde(default = "default_max_individual_votes")]
    pub max_individual_votes: i32,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            default_max_votes_per_day: default_max_votes_per_day(),
            max_individual_votes: default_max_individual_votes(),
        }
    }
}

impl VotingConfig {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz, crate::AppError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| crate::AppError::Config(format!("Invalid voting timezone: {e}")))
    }
}

/// Payment gateway (Authorize.Net) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Merchant API login ID.
    pub api_login_id: String,
    /// Merchant transaction key.
    pub transaction_key: String,
    /// Use the sandbox endpoint.
    #[serde(default = "default_true")]
    pub sandbox: bool,
    /// ISO currency code sent with every charge.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Sales tax in basis points (825 = 8.25%).
    #[serde(default)]
    pub sales_tax_bps: i64,
}

/// SMTP configuration for receipts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailConfig {
    /// Whether receipts are sent at all.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP relay host.
    #[serde(default)]
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// Sender address.
    #[serde(default)]
    pub from_address: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

/// Identity provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Firebase project ID (audience of ID tokens).
    pub project_id: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_timezone() -> String {
    "UTC".to_string()
}

const fn default_max_votes_per_day() -> i32 {
    1
}

const fn default_max_individual_votes() -> i32 {
    10_000
}

fn default_currency() -> String {
    "USD".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "talentvote".to_string()
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `TALENTVOTE_ENV`)
    /// 4. Environment variables with `TALENTVOTE_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("TALENTVOTE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALENTVOTE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("TALENTVOTE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_voting_defaults() {
        let voting = VotingConfig::default();
        assert_eq!(voting.timezone, "UTC");
        assert_eq!(voting.default_max_votes_per_day, 1);
        assert_eq!(voting.max_individual_votes, 10_000);
        assert_eq!(voting.tz().unwrap(), chrono_tz::UTC);
    }

    #[test]
    fn test_invalid_timezone_is_config_error() {
        let voting = VotingConfig {
            timezone: "Mars/Olympus".to_string(),
            ..VotingConfig::default()
        };
        assert!(matches!(voting.tz(), Err(crate::AppError::Config(_))));
    }

    #[test]
    fn test_trusted_proxies_parse() {
        let raw = r#"
            url = "https://vote.example.com"
            trusted_proxies = ["10.0.0.1", "::1"]
        "#;
        let server: ServerConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(server.trusted_proxies.len(), 2);
        assert_eq!(server.trusted_proxies[0].to_string(), "10.0.0.1");
    }

    #[test]
    fn test_deserialize_minimal_toml() {
        let raw = r#"
            [server]
            url = "https://vote.example.com"

            [database]
            url = "postgres://localhost/talentvote"

            [payment]
            api_login_id = "login"
            transaction_key = "key"
            sales_tax_bps = 825

            [identity]
            project_id = "talentvote-dev"
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.server.trusted_proxies.is_empty());
        assert!(config.payment.sandbox);
        assert_eq!(config.payment.currency, "USD");
        assert_eq!(config.payment.sales_tax_bps, 825);
        assert!(!config.email.enabled);
        assert_eq!(config.voting.timezone, "UTC");
    }
}
