//! Command implementations and shared plumbing.

pub mod addresses;
pub mod fulfillment;
pub mod labels;
pub mod replica;
pub mod report;
pub mod shipment;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;

use despacho_fulfillment::addresser::{AddresserClient, AddresserError};
use despacho_fulfillment::carrier::{CarrierClient, CarrierError, ShipmentQuery};
use despacho_fulfillment::config::{AppConfig, ConfigError};
use despacho_fulfillment::engine::{EngineError, FulfillmentEngine};
use despacho_fulfillment::replica::{Collection, ReplicaError, ReplicaStore};
use despacho_fulfillment::storefront::{
    ComparisonOp, OrderPage, OrderQueryFilter, OrderQuerySort, StorefrontClient, StorefrontError,
};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Carrier gateway failure.
    #[error(transparent)]
    Carrier(#[from] CarrierError),

    /// Storefront gateway failure.
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    /// Correction-service failure.
    #[error(transparent)]
    Addresser(#[from] AddresserError),

    /// Engine operation failure.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Replica store failure.
    #[error(transparent)]
    Replica(#[from] ReplicaError),

    /// A flag value is outside its wire vocabulary.
    #[error("Invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: String },
}

/// Assembled gateways, ready to run operations.
pub struct Context {
    pub engine: FulfillmentEngine,
}

/// Load configuration, authenticate with the carrier, and build the engine.
pub async fn context() -> Result<Context, CommandError> {
    let config = AppConfig::from_env()?;

    let carrier = CarrierClient::new(&config.carrier)?;
    tracing::info!("Authenticating with the carrier...");
    carrier.authenticate().await?;

    let storefront = StorefrontClient::new(&config.storefront)?;
    let addresser = AddresserClient::new(&config.addresser)?;
    let replica = ReplicaStore::connect(&config.replica_database_url).await?;

    Ok(Context {
        engine: FulfillmentEngine::new(
            carrier,
            storefront,
            addresser,
            replica,
            config.sender,
            config.downloads_dir,
        ),
    })
}

/// Order-selection flags shared by the list-based commands.
#[derive(clap::Args, Debug)]
pub struct OrderSelection {
    /// Comma-separated order numbers
    #[arg(long, value_delimiter = ',')]
    pub numbers: Option<Vec<String>>,

    /// Only orders created at or after this RFC 3339 timestamp
    #[arg(long)]
    pub created_after: Option<DateTime<Utc>>,

    /// Payment status (PAID, NOT_PAID, PENDING, ...)
    #[arg(long)]
    pub payment_status: Option<String>,

    /// Fulfillment status (FULFILLED, NOT_FULFILLED, ...)
    #[arg(long)]
    pub fulfillment_status: Option<String>,
}

impl OrderSelection {
    /// Build the storefront query filter.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArgument`] when a status flag is
    /// outside its wire vocabulary.
    pub fn to_filter(&self) -> Result<OrderQueryFilter, CommandError> {
        Ok(OrderQueryFilter {
            date_created: self
                .created_after
                .map(|timestamp| (ComparisonOp::Gte, timestamp)),
            numbers: self.numbers.clone(),
            payment_status: self
                .payment_status
                .as_deref()
                .map(|value| parse_wire(value, "payment status"))
                .transpose()?,
            fulfillment_status: self
                .fulfillment_status
                .as_deref()
                .map(|value| parse_wire(value, "fulfillment status"))
                .transpose()?,
            ..OrderQueryFilter::default()
        })
    }
}

/// Pre-postagem query flags.
#[derive(clap::Args, Debug)]
pub struct ShipmentQueryArgs {
    /// Tracking code
    #[arg(long)]
    pub object_code: Option<String>,

    /// Shipment status (PREATENDIDO, PREPOSTADO, POSTADO, ...)
    #[arg(long)]
    pub status: Option<String>,

    /// Payment modality (A_VISTA, A_FATURAR, ...)
    #[arg(long)]
    pub payment_mode: Option<String>,

    /// Object type (TODOS, SIMPLES, REGISTRADO)
    #[arg(long)]
    pub object_type: Option<String>,
}

impl ShipmentQueryArgs {
    /// Build the carrier query.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidArgument`] when a flag is outside its
    /// wire vocabulary.
    pub fn to_query(&self) -> Result<ShipmentQuery, CommandError> {
        Ok(ShipmentQuery {
            object_code: self.object_code.clone(),
            status: self
                .status
                .as_deref()
                .map(|value| parse_wire(value, "shipment status"))
                .transpose()?,
            payment_mode: self
                .payment_mode
                .as_deref()
                .map(|value| parse_wire(value, "payment mode"))
                .transpose()?,
            object_type: self
                .object_type
                .as_deref()
                .map(|value| parse_wire(value, "object type"))
                .transpose()?,
        })
    }
}

/// Replica collection flag.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CollectionArg {
    Orders,
    Shipments,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Orders => Self::Orders,
            CollectionArg::Shipments => Self::Shipments,
        }
    }
}

/// Fetch all orders matching the selection, number-ascending.
pub async fn select_orders(
    engine: &FulfillmentEngine,
    selection: &OrderSelection,
) -> Result<OrderPage, CommandError> {
    let filter = selection.to_filter()?;
    Ok(engine
        .storefront()
        .query_orders_all(&filter, OrderQuerySort::NumberAsc)
        .await?)
}

/// Parse a flag value against an enum's wire vocabulary.
fn parse_wire<T: DeserializeOwned>(value: &str, what: &'static str) -> Result<T, CommandError> {
    serde_json::from_value(serde_json::Value::String(value.to_uppercase()))
        .map_err(|_| CommandError::InvalidArgument {
            what,
            value: value.to_string(),
        })
}
