//! Storefront order API client.
//!
//! Read-mostly: orders are created and mutated by the storefront itself;
//! this side queries them and creates/deletes fulfillment records. Requests
//! authenticate with static headers (API token, account id, site id).

mod client;
pub mod types;

pub use client::StorefrontClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the storefront API.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A configured header value was not valid.
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
}
