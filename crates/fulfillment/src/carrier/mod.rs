//! Carrier API client (pre-postagem lifecycle, address lookup, labels).
//!
//! # Architecture
//!
//! - Plain JSON over HTTPS with a bearer token obtained from the carrier's
//!   Basic-auth token endpoint (posting-card variant when a card number is
//!   configured)
//! - The token is fetched once per [`CarrierClient::authenticate`] call and
//!   cached in the client; it is **not** refreshed when a later call gets a
//!   401 - long-lived processes must re-authenticate themselves
//! - Lookup-style endpoints return `Ok(None)` for "not found" so callers can
//!   tell it apart from transport failures
//!
//! # Example
//!
//! ```rust,ignore
//! use despacho_fulfillment::carrier::CarrierClient;
//!
//! let client = CarrierClient::new(&config.carrier)?;
//! client.authenticate().await?;
//!
//! let resolved = client.resolve_address("01310-100").await?;
//! let record = client.create_shipment(&request).await?;
//! ```

mod client;
pub mod types;

pub use client::CarrierClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the carrier API.
#[derive(Debug, Error)]
pub enum CarrierError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Token fetch kept failing after the retry budget.
    #[error("authentication failed after {attempts} attempts: {message}")]
    Auth { attempts: u32, message: String },

    /// No bearer token cached; call `authenticate()` first.
    #[error("no bearer token; call authenticate() first")]
    NoToken,

    /// Operation requires a posting card but none is configured.
    #[error("no posting card configured")]
    MissingPostingCard,

    /// A binary payload could not be decoded.
    #[error("payload decode error: {0}")]
    Decode(String),
}
