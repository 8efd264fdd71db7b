//! Despacho fulfillment - gateways and reconciliation engine.
//!
//! Bridges three external services to fulfill storefront orders through a
//! Correios-style carrier:
//!
//! - [`carrier`] - pre-postagem lifecycle, postal-code lookup, and async
//!   label generation against the carrier API
//! - [`storefront`] - order query and fulfillment mutations against the
//!   storefront API
//! - [`addresser`] - batched submissions to the bulk address-correction
//!   service
//! - [`replica`] - last-write-wins JSONB replica of orders and shipment
//!   records
//! - [`engine`] - the reconciliation engine composing the above: order to
//!   shipment mapping, correction batching, fuzzy address consistency
//!   checks, label retrieval, and fulfillment sync
//!
//! Configuration comes from environment variables via [`config::AppConfig`].
//!
//! All I/O is sequential: one request at a time, awaited to completion.
//! There are no work queues and no cross-service transactions - a carrier
//! call can succeed while the follow-up storefront write fails, and no
//! compensating action is taken.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod addresser;
pub mod carrier;
pub mod config;
pub mod engine;
pub mod replica;
pub mod storefront;
