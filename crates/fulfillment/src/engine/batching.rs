//! Correction-batch assembly.
//!
//! The downstream address-correction service caps each request at four
//! recipients, so the recipient list is flushed in fixed-size groups and the
//! last partial group is still sent. Malformed postal codes fail the
//! affected order instead of producing a malformed wire string; the
//! pipeline records them and keeps going.

use despacho_core::Cep;

use crate::addresser::{
    CorrectionArtifact, CorrectionRecipient, CorrectionSender, MAX_RECIPIENTS_PER_BATCH,
};
use crate::carrier::types::ResolvedAddress;
use crate::config::SenderConfig;
use crate::storefront::types::Order;

use super::{EngineError, mapping};

/// Recipients per correction request.
pub const CORRECTION_BATCH_SIZE: usize = MAX_RECIPIENTS_PER_BATCH;

/// Result of the correction pipeline: one artifact per submitted batch, in
/// submission order, plus the orders that could not be included.
#[derive(Debug, Default)]
pub struct CorrectionOutcome {
    pub artifacts: Vec<CorrectionArtifact>,
    pub skipped: Vec<SkippedOrder>,
}

/// An order left out of the correction pipeline, with the failure reason.
#[derive(Debug, Clone)]
pub struct SkippedOrder {
    pub number: String,
    pub reason: String,
}

/// The sender block sent with every batch.
pub(crate) fn correction_sender(sender: &SenderConfig) -> CorrectionSender {
    CorrectionSender {
        name: sender.name.clone(),
        tax_id: sender.tax_id.clone(),
        street: sender.street.clone(),
        number: sender.number.clone(),
        complement: sender.complement.clone(),
        neighborhood: sender.neighborhood.clone(),
        city: sender.city.clone(),
        state: sender.state.clone(),
        cep: sender.cep.clone(),
    }
}

/// Build one correction recipient from an order and its resolved address.
///
/// Unlike the shipment mapping, the street here is the buyer's freeform one
/// (the correction service is the thing fixing it); neighborhood, city, and
/// state come from the resolver. The document falls back to the company's
/// when the buyer's billing document is empty.
///
/// # Errors
///
/// Returns [`EngineError::MissingShippingAddress`] for non-shippable orders
/// and [`EngineError::PostalCode`] when the resolved CEP does not clean up
/// to eight digits.
pub(crate) fn correction_recipient(
    order: &Order,
    resolved: &ResolvedAddress,
    sender: &SenderConfig,
) -> Result<CorrectionRecipient, EngineError> {
    let address = order
        .shipping_address()
        .ok_or_else(|| EngineError::MissingShippingAddress(order.number.clone()))?;

    let billing_tax_id = order
        .billing_info
        .as_ref()
        .and_then(|billing| billing.tax_id.as_deref());

    Ok(CorrectionRecipient {
        id: order.number.clone(),
        name: mapping::recipient_name(address),
        tax_id: mapping::recipient_tax_id(billing_tax_id, sender),
        street: address.street_name.clone(),
        number: address.street_number.clone(),
        complement: address.address_line2.clone(),
        neighborhood: resolved.neighborhood.clone(),
        city: resolved.city.clone(),
        state: resolved.state.clone(),
        cep: Cep::parse(&resolved.cep)?.hyphenated(),
        declared_items: mapping::declared_items(order),
        total_weight: comma_weight(order),
    })
}

/// Weight in kilograms with the comma decimal separator the correction
/// service expects ("2,5").
fn comma_weight(order: &Order) -> String {
    order.totals.weight.to_string().replace('.', ",")
}
