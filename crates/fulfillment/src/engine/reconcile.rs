//! Fuzzy address-consistency check.
//!
//! Compares each order's freeform street against the carrier's canonical
//! street for the same postal code with a case-insensitive partial-ratio
//! score. A heuristic data-quality report, not a correctness guarantee:
//! abbreviations and accents produce expected false positives.

use rapidfuzz::fuzz;

use crate::carrier::types::ResolvedAddress;
use crate::storefront::types::Order;

/// Scores below this (out of 100) flag the order as inconsistent.
pub const CONSISTENCY_THRESHOLD: u8 = 99;

/// One row of the inconsistency report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFinding {
    pub order_number: String,
    pub recipient_name: String,
    /// Street as the buyer typed it.
    pub order_street: String,
    /// Street as the carrier's postal database has it.
    pub canonical_street: String,
    /// Partial-ratio similarity, 0-100.
    pub score: u8,
    pub order_city: String,
    pub canonical_city: String,
}

/// Case-insensitive partial-ratio similarity between two street names.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn street_similarity(order_street: &str, canonical_street: &str) -> u8 {
    let score = fuzz::partial_ratio(
        order_street.to_lowercase().chars(),
        canonical_street.to_lowercase().chars(),
    );
    score.round() as u8
}

/// Score one order against its resolved address; `Some` when inconsistent.
///
/// Orders without a shipping address are not scored. A failed or empty
/// resolution scores against the empty canonical street, which flags the
/// order.
pub(crate) fn finding(order: &Order, resolved: &ResolvedAddress) -> Option<AddressFinding> {
    let address = order.shipping_address()?;
    let score = street_similarity(&address.street_name, &resolved.street);

    (score < CONSISTENCY_THRESHOLD).then(|| AddressFinding {
        order_number: order.number.clone(),
        recipient_name: address.first_name.trim().to_string(),
        order_street: address.street_name.clone(),
        canonical_street: resolved.street.clone(),
        score,
        order_city: address.city.clone(),
        canonical_city: resolved.city.clone(),
    })
}

/// Sort findings by order number ascending (numeric where possible).
pub(crate) fn sort_findings(findings: &mut [AddressFinding]) {
    findings.sort_by_key(|finding| {
        (
            finding.order_number.parse::<u64>().unwrap_or(u64::MAX),
            finding.order_number.clone(),
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::storefront::types::{
        FulfillmentStatus, OrderTotals, PaymentStatus, ShipmentDetails, ShippingAddress,
        ShippingInfo,
    };

    fn order_with_street(number: &str, street: &str) -> Order {
        Order {
            id: format!("ord-{number}"),
            number: number.to_string(),
            line_items: vec![],
            billing_info: None,
            shipping_info: Some(ShippingInfo {
                delivery_option: "PAC".to_string(),
                shipment_details: Some(ShipmentDetails {
                    address: ShippingAddress {
                        first_name: "Ana".to_string(),
                        street_name: street.to_string(),
                        city: "Sao Paulo".to_string(),
                        ..ShippingAddress::default()
                    },
                }),
            }),
            totals: OrderTotals {
                subtotal: Decimal::ZERO,
                weight: Decimal::ZERO,
            },
            fulfillments: vec![],
            payment_status: PaymentStatus::Paid,
            fulfillment_status: FulfillmentStatus::NotFulfilled,
            read: false,
            archived: false,
            date_created: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single().expect("ts"),
            last_updated: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single().expect("ts"),
        }
    }

    fn resolved_with_street(street: &str) -> ResolvedAddress {
        ResolvedAddress {
            cep: "01310100".to_string(),
            street: street.to_string(),
            city: "Sao Paulo".to_string(),
            ..ResolvedAddress::default()
        }
    }

    #[test]
    fn exact_match_scores_100() {
        assert_eq!(street_similarity("Avenida Paulista", "Avenida Paulista"), 100);
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(street_similarity("AVENIDA PAULISTA", "avenida paulista"), 100);
    }

    #[test]
    fn substring_scores_100_under_partial_ratio() {
        assert_eq!(street_similarity("Paulista", "Avenida Paulista"), 100);
    }

    #[test]
    fn empty_canonical_street_scores_zero() {
        assert_eq!(street_similarity("Avenida Paulista", ""), 0);
    }

    #[test]
    fn consistent_order_produces_no_finding() {
        let order = order_with_street("1021", "Avenida Paulista");
        assert!(finding(&order, &resolved_with_street("avenida paulista")).is_none());
    }

    #[test]
    fn divergent_street_is_flagged() {
        let order = order_with_street("1021", "Rua Quinze de Novembro");
        let found = finding(&order, &resolved_with_street("Avenida Paulista")).expect("finding");

        assert_eq!(found.order_number, "1021");
        assert_eq!(found.order_street, "Rua Quinze de Novembro");
        assert_eq!(found.canonical_street, "Avenida Paulista");
        assert!(found.score < CONSISTENCY_THRESHOLD);
    }

    #[test]
    fn order_without_address_is_not_scored() {
        let mut order = order_with_street("1021", "Rua A");
        order.shipping_info = None;
        assert!(finding(&order, &resolved_with_street("Rua B")).is_none());
    }

    #[test]
    fn findings_sort_numerically_by_order_number() {
        let mut findings: Vec<AddressFinding> = ["120", "1001", "99"]
            .iter()
            .map(|number| AddressFinding {
                order_number: (*number).to_string(),
                recipient_name: String::new(),
                order_street: String::new(),
                canonical_street: String::new(),
                score: 0,
                order_city: String::new(),
                canonical_city: String::new(),
            })
            .collect();

        sort_findings(&mut findings);

        let numbers: Vec<&str> = findings.iter().map(|f| f.order_number.as_str()).collect();
        assert_eq!(numbers, vec!["99", "120", "1001"]);
    }
}
