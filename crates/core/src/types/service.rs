//! Delivery-service code table.
//!
//! Storefront orders carry a delivery option label; the carrier wants the
//! contracted service code plus the matching additional-service code. The
//! mapping is a fixed two-way table - anything outside it is unmapped and
//! must be treated as an error by callers.

use serde::{Deserialize, Serialize};

/// A contracted carrier delivery service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryService {
    /// PAC CONTRATO AG
    Pac,
    /// SEDEX CONTRATO AG
    Sedex,
}

impl DeliveryService {
    /// Map a storefront delivery option label to a contracted service.
    ///
    /// Returns `None` for unmapped options; callers decide whether that is
    /// an error.
    #[must_use]
    pub fn from_delivery_option(option: &str) -> Option<Self> {
        match option {
            "PAC" => Some(Self::Pac),
            "SEDEX" => Some(Self::Sedex),
            _ => None,
        }
    }

    /// The carrier service code.
    #[must_use]
    pub const fn service_code(self) -> &'static str {
        match self {
            Self::Pac => "03298",
            Self::Sedex => "03220",
        }
    }

    /// The additional-service code paired with the service (declared-value
    /// insurance tier).
    #[must_use]
    pub const fn additional_service_code(self) -> &'static str {
        match self {
            Self::Pac => "064",
            Self::Sedex => "019",
        }
    }
}
