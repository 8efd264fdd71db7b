//! Storefront API domain types.
//!
//! Orders are owned by the storefront - this system only reads them and
//! requests fulfillment mutations. Field names on the wire are camelCase.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A storefront order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Opaque storefront-internal id.
    pub id: String,
    /// Human-readable sequential order number.
    pub number: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub billing_info: Option<BillingInfo>,
    #[serde(default)]
    pub shipping_info: Option<ShippingInfo>,
    pub totals: OrderTotals,
    #[serde(default)]
    pub fulfillments: Vec<Fulfillment>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub fulfillment_status: FulfillmentStatus,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub archived: bool,
    pub date_created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Order {
    /// The shipping address, when the order has shipment details.
    #[must_use]
    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_info
            .as_ref()
            .and_then(|info| info.shipment_details.as_ref())
            .map(|details| &details.address)
    }

    /// Tracking numbers across all fulfillments, in order.
    #[must_use]
    pub fn tracking_numbers(&self) -> Vec<String> {
        self.fulfillments
            .iter()
            .filter_map(|f| f.tracking_info.as_ref())
            .filter_map(|t| t.tracking_number.clone())
            .collect()
    }
}

/// One order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Position of the line within the order.
    #[serde(default)]
    pub index: u32,
    /// Product reference.
    pub product_id: String,
    /// Display name of the product.
    pub name: String,
    pub quantity: u32,
    /// Unit price.
    pub price: Decimal,
    /// Line total (quantity x unit price, after line discounts).
    pub total_price: Decimal,
}

/// Billing details; only the buyer document is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingInfo {
    #[serde(default)]
    pub tax_id: Option<String>,
}

/// Shipping section of an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    /// Delivery option label chosen at checkout ("PAC", "SEDEX", ...).
    #[serde(default)]
    pub delivery_option: String,
    /// Present only for shippable orders.
    #[serde(default)]
    pub shipment_details: Option<ShipmentDetails>,
}

/// Shipment details of a shippable order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentDetails {
    pub address: ShippingAddress,
}

/// Buyer-supplied shipping address (freeform - not canonical).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Freeform street name as typed by the buyer.
    #[serde(default)]
    pub street_name: String,
    #[serde(default)]
    pub street_number: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    /// Region/state code.
    #[serde(default)]
    pub subdivision: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    /// Buyer document; empty or absent when legally exempt.
    #[serde(default)]
    pub tax_id: Option<String>,
}

/// Order totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    /// Total weight in kilograms.
    pub weight: Decimal,
}

/// A fulfillment record on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fulfillment {
    pub id: String,
    #[serde(default)]
    pub tracking_info: Option<TrackingInfo>,
}

/// Tracking details of a fulfillment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub shipping_provider: Option<String>,
    #[serde(default)]
    pub tracking_link: Option<String>,
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    UnspecifiedPaymentStatus,
    Pending,
    NotPaid,
    Paid,
    PartiallyRefunded,
    FullyRefunded,
    PartiallyPaid,
}

impl PaymentStatus {
    /// Wire value used in query filters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnspecifiedPaymentStatus => "UNSPECIFIED_PAYMENT_STATUS",
            Self::Pending => "PENDING",
            Self::NotPaid => "NOT_PAID",
            Self::Paid => "PAID",
            Self::PartiallyRefunded => "PARTIALLY_REFUNDED",
            Self::FullyRefunded => "FULLY_REFUNDED",
            Self::PartiallyPaid => "PARTIALLY_PAID",
        }
    }
}

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    Fulfilled,
    #[default]
    NotFulfilled,
    Canceled,
    PartiallyFulfilled,
}

impl FulfillmentStatus {
    /// Wire value used in query filters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fulfilled => "FULFILLED",
            Self::NotFulfilled => "NOT_FULFILLED",
            Self::Canceled => "CANCELED",
            Self::PartiallyFulfilled => "PARTIALLY_FULFILLED",
        }
    }
}

/// Comparison operator for date predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl ComparisonOp {
    /// Operator key in the storefront filter grammar.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
        }
    }
}

/// Filter for order queries.
///
/// All predicates are optional and combined with logical AND; unset
/// predicates are omitted from the filter document.
#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    pub date_created: Option<(ComparisonOp, DateTime<Utc>)>,
    pub last_updated: Option<(ComparisonOp, DateTime<Utc>)>,
    /// Membership filter on order numbers.
    pub numbers: Option<Vec<String>>,
    pub read: Option<bool>,
    pub archived: Option<bool>,
    pub payment_status: Option<PaymentStatus>,
    pub fulfillment_status: Option<FulfillmentStatus>,
}

impl OrderQueryFilter {
    /// Build the storefront filter document.
    ///
    /// Boolean flags travel as `"true"`/`"false"` strings - a quirk of the
    /// storefront filter grammar.
    #[must_use]
    pub fn to_filter_json(&self) -> serde_json::Value {
        let mut filter = serde_json::Map::new();

        if let Some((op, timestamp)) = &self.last_updated {
            filter.insert(
                "lastUpdated".to_string(),
                serde_json::json!({ op.as_str(): timestamp.to_rfc3339() }),
            );
        }
        if let Some((op, timestamp)) = &self.date_created {
            filter.insert(
                "dateCreated".to_string(),
                serde_json::json!({ op.as_str(): timestamp.to_rfc3339() }),
            );
        }
        if let Some(numbers) = &self.numbers {
            filter.insert(
                "number".to_string(),
                serde_json::json!({ "$hasSome": numbers }),
            );
        }
        if let Some(read) = self.read {
            filter.insert("read".to_string(), serde_json::json!(read.to_string()));
        }
        if let Some(archived) = self.archived {
            filter.insert(
                "archived".to_string(),
                serde_json::json!(archived.to_string()),
            );
        }
        if let Some(status) = self.payment_status {
            filter.insert(
                "paymentStatus".to_string(),
                serde_json::json!(status.as_str()),
            );
        }
        if let Some(status) = self.fulfillment_status {
            filter.insert(
                "fulfillmentStatus".to_string(),
                serde_json::json!(status.as_str()),
            );
        }

        serde_json::Value::Object(filter)
    }
}

/// Sort order for order queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderQuerySort {
    DateCreatedAsc,
    DateCreatedDesc,
    LastUpdatedAsc,
    LastUpdatedDesc,
    #[default]
    NumberAsc,
    NumberDesc,
}

impl OrderQuerySort {
    /// The sort document entry for the query body.
    #[must_use]
    pub fn to_sort_json(self) -> serde_json::Value {
        let (field, direction) = match self {
            Self::DateCreatedAsc => ("dateCreated", "asc"),
            Self::DateCreatedDesc => ("dateCreated", "desc"),
            Self::LastUpdatedAsc => ("lastUpdated", "asc"),
            Self::LastUpdatedDesc => ("lastUpdated", "desc"),
            Self::NumberAsc => ("number", "asc"),
            Self::NumberDesc => ("number", "desc"),
        };
        serde_json::json!({ field: direction })
    }
}

/// One page (or accumulated pages) of an order query.
///
/// The order-number range summary is memoized per result object, so a new
/// query always recomputes it - there is no process-global cache to go
/// stale.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    /// Total matching rows reported by the storefront.
    pub total_results: u64,
    number_summary: OnceLock<String>,
}

impl OrderPage {
    /// Wrap a query result.
    #[must_use]
    pub fn new(orders: Vec<Order>, total_results: u64) -> Self {
        Self {
            orders,
            total_results,
            number_summary: OnceLock::new(),
        }
    }

    /// Human-readable summary of the order numbers in this result, with
    /// consecutive runs collapsed ("1001 - 1004, 1006"). Computed once per
    /// page.
    pub fn number_summary(&self) -> &str {
        self.number_summary
            .get_or_init(|| summarize_order_numbers(&self.orders))
    }
}

/// Collapse sorted order numbers into consecutive runs.
fn summarize_order_numbers(orders: &[Order]) -> String {
    let mut numbers: Vec<u64> = orders
        .iter()
        .filter_map(|order| order.number.parse().ok())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();

    let mut runs: Vec<(u64, u64)> = Vec::new();
    for number in numbers {
        match runs.last_mut() {
            Some((_, end)) if number == *end + 1 => *end = number,
            _ => runs.push((number, number)),
        }
    }

    runs.iter()
        .map(|(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start} - {end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fulfillment payload for the create endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentRequest {
    pub line_items: Vec<FulfillmentLineItem>,
    pub tracking_info: TrackingInfo,
}

/// Line reference inside a fulfillment - index and quantity only; the
/// product reference is not forwarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentLineItem {
    pub index: u32,
    pub quantity: u32,
}
