//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARRIER_BASE_URL` - Carrier API base URL
//! - `CARRIER_USER` - Carrier portal user ("Meu Correios")
//! - `CARRIER_ACCESS_CODE` - Carrier API access code
//! - `CARRIER_CNPJ` - Company CNPJ registered on the carrier contract
//! - `CARRIER_CONTRACT` - Carrier contract number
//! - `STOREFRONT_BASE_URL` - Storefront API base URL
//! - `STOREFRONT_API_TOKEN` - Storefront API authorization token
//! - `STOREFRONT_ACCOUNT_ID` - Storefront account id header value
//! - `STOREFRONT_SITE_ID` - Storefront site id header value
//! - `ADDRESSER_BASE_URL` - Bulk address-correction service base URL
//! - `REPLICA_DATABASE_URL` - `PostgreSQL` connection string for the replica store
//! - `SENDER_NAME`, `SENDER_TAX_ID`, `SENDER_STREET`, `SENDER_NUMBER`,
//!   `SENDER_NEIGHBORHOOD`, `SENDER_CITY`, `SENDER_STATE`, `SENDER_CEP` -
//!   sender (remetente) identity and address
//!
//! ## Optional
//! - `CARRIER_POSTING_CARD` - Posting-card number; when set, authentication
//!   uses the posting-card token variant and label requests carry the card
//! - `SENDER_COMPLEMENT` - Sender address complement
//! - `SENDER_EMAIL` - Sender contact email
//! - `DOWNLOADS_DIR` - Output directory for labels/declarations (default: `downloads`)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Carrier API configuration.
    pub carrier: CarrierConfig,
    /// Storefront API configuration.
    pub storefront: StorefrontConfig,
    /// Bulk address-correction service configuration.
    pub addresser: AddresserConfig,
    /// `PostgreSQL` connection URL for the replica store (contains password).
    pub replica_database_url: SecretString,
    /// Sender (remetente) identity used on shipment requests and correction
    /// batches.
    pub sender: SenderConfig,
    /// Directory for downloaded labels and content declarations.
    pub downloads_dir: PathBuf,
}

/// Carrier API configuration.
///
/// Implements `Debug` manually to redact the access code.
#[derive(Clone)]
pub struct CarrierConfig {
    /// Carrier API base URL.
    pub base_url: String,
    /// Portal user requesting tokens and cancellations.
    pub user: String,
    /// API access code exchanged for bearer tokens.
    pub access_code: SecretString,
    /// Company CNPJ on the contract.
    pub cnpj: String,
    /// Contract number.
    pub contract: String,
    /// Posting-card number; selects the posting-card token variant when set.
    pub posting_card: Option<String>,
}

impl std::fmt::Debug for CarrierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierConfig")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("access_code", &"[REDACTED]")
            .field("cnpj", &self.cnpj)
            .field("contract", &self.contract)
            .field("posting_card", &self.posting_card)
            .finish()
    }
}

/// Storefront API configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Storefront API base URL.
    pub base_url: String,
    /// Static authorization token sent on every request.
    pub api_token: SecretString,
    /// Account id header value.
    pub account_id: String,
    /// Site id header value.
    pub site_id: String,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("site_id", &self.site_id)
            .finish()
    }
}

/// Bulk address-correction service configuration.
#[derive(Debug, Clone)]
pub struct AddresserConfig {
    /// Service base URL.
    pub base_url: String,
}

/// Sender (remetente) identity and address.
///
/// Used verbatim on shipment requests and correction batches. The tax id
/// doubles as the fallback recipient document when the buyer's is exempt or
/// missing.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Legal or display name.
    pub name: String,
    /// CPF/CNPJ document number.
    pub tax_id: String,
    /// Street (logradouro).
    pub street: String,
    /// Street number.
    pub number: String,
    /// Address complement.
    pub complement: String,
    /// Neighborhood (bairro).
    pub neighborhood: String,
    /// City.
    pub city: String,
    /// Two-letter state code (UF).
    pub state: String,
    /// Eight-digit postal code.
    pub cep: String,
    /// Contact email, when the carrier contract carries one.
    pub email: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            carrier: CarrierConfig::from_env()?,
            storefront: StorefrontConfig::from_env()?,
            addresser: AddresserConfig::from_env()?,
            replica_database_url: get_required_secret("REPLICA_DATABASE_URL")?,
            sender: SenderConfig::from_env()?,
            downloads_dir: PathBuf::from(get_env_or_default("DOWNLOADS_DIR", "downloads")),
        })
    }
}

impl CarrierConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_required_env("CARRIER_BASE_URL")?,
            user: get_required_env("CARRIER_USER")?,
            access_code: get_required_secret("CARRIER_ACCESS_CODE")?,
            cnpj: get_required_env("CARRIER_CNPJ")?,
            contract: get_required_env("CARRIER_CONTRACT")?,
            posting_card: get_optional_env("CARRIER_POSTING_CARD"),
        })
    }
}

impl StorefrontConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_required_env("STOREFRONT_BASE_URL")?,
            api_token: get_required_secret("STOREFRONT_API_TOKEN")?,
            account_id: get_required_env("STOREFRONT_ACCOUNT_ID")?,
            site_id: get_required_env("STOREFRONT_SITE_ID")?,
        })
    }
}

impl AddresserConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_required_env("ADDRESSER_BASE_URL")?,
        })
    }
}

impl SenderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            name: get_required_env("SENDER_NAME")?,
            tax_id: get_required_env("SENDER_TAX_ID")?,
            street: get_required_env("SENDER_STREET")?,
            number: get_required_env("SENDER_NUMBER")?,
            complement: get_env_or_default("SENDER_COMPLEMENT", ""),
            neighborhood: get_required_env("SENDER_NEIGHBORHOOD")?,
            city: get_required_env("SENDER_CITY")?,
            state: get_required_env("SENDER_STATE")?,
            cep: get_required_env("SENDER_CEP")?,
            email: get_optional_env("SENDER_EMAIL"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
