//! Shared domain types.

pub mod phone;
pub mod postal_code;
pub mod service;

pub use phone::PhoneParts;
pub use postal_code::{Cep, CepError, digits_only};
pub use service::DeliveryService;
