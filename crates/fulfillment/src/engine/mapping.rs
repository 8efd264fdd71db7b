//! Order to shipment-request mapping.
//!
//! Deterministic pure transform. Canonical address fields (street,
//! neighborhood, city, state, CEP) come from the carrier's resolver; only
//! the street number and complement are taken from the buyer's freeform
//! address. The buyer-supplied city/state are deliberately overridden.

use rust_decimal::Decimal;

use despacho_core::{DeliveryService, PhoneParts};

use crate::carrier::types::{
    AdditionalService, DeclaredItem, PartyAddress, RecipientParty, SenderParty, ShipmentRequest,
    ResolvedAddress,
};
use crate::config::SenderConfig;
use crate::storefront::types::{Order, ShippingAddress};

use super::EngineError;

/// Build the carrier shipment request for an order.
///
/// # Errors
///
/// Returns [`EngineError::MissingShippingAddress`] when the order has no
/// shipment details, or [`EngineError::UnmappedDeliveryOption`] when the
/// delivery option is outside the PAC/SEDEX table.
pub(crate) fn shipment_request(
    order: &Order,
    resolved: &ResolvedAddress,
    sender: &SenderConfig,
) -> Result<ShipmentRequest, EngineError> {
    let address = order
        .shipping_address()
        .ok_or_else(|| EngineError::MissingShippingAddress(order.number.clone()))?;

    let delivery_option = order
        .shipping_info
        .as_ref()
        .map(|info| info.delivery_option.as_str())
        .unwrap_or_default();
    let service = DeliveryService::from_delivery_option(delivery_option).ok_or_else(|| {
        EngineError::UnmappedDeliveryOption {
            order: order.number.clone(),
            option: delivery_option.to_string(),
        }
    })?;

    let phone = PhoneParts::split(&address.phone);
    let correlation = format!("number:{}", order.number);

    Ok(ShipmentRequest {
        sender: sender_party(sender),
        recipient: RecipientParty {
            name: recipient_name(address),
            landline_area_code: String::new(),
            landline: String::new(),
            mobile_area_code: phone.area_code,
            mobile: phone.number,
            email: address.email.clone(),
            tax_id: recipient_tax_id(address.tax_id.as_deref(), sender),
            foreign_document: String::new(),
            note: correlation.clone(),
            address: PartyAddress {
                cep: resolved.cep.clone(),
                street: resolved.street.clone(),
                number: address.street_number.clone(),
                complement: address.address_line2.clone(),
                neighborhood: resolved.neighborhood.clone(),
                city: resolved.city.clone(),
                state: resolved.state.clone(),
            },
        },
        service_code: service.service_code().to_string(),
        additional_services: vec![AdditionalService {
            code: service.additional_service_code().to_string(),
            declared_value: Some(order.totals.subtotal),
        }],
        declared_items: declared_items(order),
        weight_grams: weight_grams(order.totals.weight),
        observation: correlation,
    })
}

/// Recipient display name: first + last, trimmed, single-space joined.
pub(crate) fn recipient_name(address: &ShippingAddress) -> String {
    let first = address.first_name.trim();
    let last = address.last_name.trim();
    match (first.is_empty(), last.is_empty()) {
        (true, _) => last.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{first} {last}"),
    }
}

/// Recipient document: the buyer's when present and non-empty, else the
/// sender/company fallback (buyer legally exempt or unavailable).
pub(crate) fn recipient_tax_id(tax_id: Option<&str>, sender: &SenderConfig) -> String {
    match tax_id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => sender.tax_id.clone(),
    }
}

/// Declared-content lines: one per order line item, valued at the line
/// total.
pub(crate) fn declared_items(order: &Order) -> Vec<DeclaredItem> {
    order
        .line_items
        .iter()
        .map(|item| DeclaredItem {
            description: item.name.clone(),
            quantity: item.quantity,
            value: item.total_price,
        })
        .collect()
}

/// Declared weight: kilograms to integer grams, truncated, as a string.
pub(crate) fn weight_grams(weight_kg: Decimal) -> String {
    (weight_kg * Decimal::from(1000)).trunc().to_string()
}

fn sender_party(sender: &SenderConfig) -> SenderParty {
    SenderParty {
        name: sender.name.clone(),
        tax_id: sender.tax_id.clone(),
        email: sender.email.clone(),
        address: PartyAddress {
            cep: sender.cep.clone(),
            street: sender.street.clone(),
            number: sender.number.clone(),
            complement: sender.complement.clone(),
            neighborhood: sender.neighborhood.clone(),
            city: sender.city.clone(),
            state: sender.state.clone(),
        },
    }
}
