//! Reconciliation engine.
//!
//! Composes the carrier, storefront, and correction gateways with the
//! replica store to run the fulfillment operations end to end: translate an
//! order into a shipment, keep addresses consistent, batch correction
//! submissions, retrieve labels, and mirror fulfillment state back to the
//! storefront.
//!
//! Everything runs sequentially. Batch operations skip failing items and
//! report them; single-order operations abort on the first error. No
//! operation spans the external systems transactionally - a shipment can
//! exist at the carrier while the storefront fulfillment write failed, and
//! no compensating action is taken.

pub mod batching;
pub mod labels;
pub mod reconcile;

mod mapping;

pub use batching::{CORRECTION_BATCH_SIZE, CorrectionOutcome, SkippedOrder};
pub use labels::{LabelState, PollPolicy};
pub use reconcile::{AddressFinding, CONSISTENCY_THRESHOLD};

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use despacho_core::CepError;

use crate::addresser::{AddresserClient, AddresserError, CorrectionBatch};
use crate::carrier::{CarrierClient, CarrierError};
use crate::carrier::types::{ResolvedAddress, ShipmentQuery, ShipmentRecord};
use crate::config::SenderConfig;
use crate::replica::{Collection, ReplicaError, ReplicaStore};
use crate::storefront::{StorefrontClient, StorefrontError};
use crate::storefront::types::{
    FulfillmentLineItem, FulfillmentRequest, Order, OrderQueryFilter, OrderQuerySort,
    TrackingInfo,
};

/// Carrier name written on storefront fulfillments.
const TRACKING_PROVIDER: &str = "Correios";

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No order with the given number in the storefront.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// The order has no shipment details to build a shipment from.
    #[error("order {0} has no shipping address")]
    MissingShippingAddress(String),

    /// The order's delivery option is outside the service-code table.
    #[error("order {order} has unmapped delivery option {option:?}")]
    UnmappedDeliveryOption { order: String, option: String },

    /// The carrier created the shipment but returned no tracking code.
    #[error("carrier returned no object code for order {0}")]
    MissingObjectCode(String),

    /// A postal code failed validation.
    #[error("malformed postal code: {0}")]
    PostalCode(#[from] CepError),

    /// Carrier gateway failure.
    #[error(transparent)]
    Carrier(#[from] CarrierError),

    /// Storefront gateway failure.
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    /// Correction-service failure.
    #[error(transparent)]
    Addresser(#[from] AddresserError),

    /// Replica-store failure.
    #[error(transparent)]
    Replica(#[from] ReplicaError),

    /// Document serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing a downloaded artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a cancel operation: cancels are issued per tracked
/// fulfillment with failures isolated, so both lists can be non-empty.
#[derive(Debug, Default)]
pub struct CancelReport {
    /// Tracking codes canceled at the carrier.
    pub canceled: Vec<String>,
    /// Tracking codes whose cancel failed, with the failure message.
    pub failed: Vec<FailedCancel>,
}

/// One failed cancel.
#[derive(Debug, Clone)]
pub struct FailedCancel {
    pub object_code: String,
    pub error: String,
}

/// Outcome of an order replication run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaSummary {
    /// Documents inserted or replaced.
    pub applied: usize,
    /// Documents left untouched by the last-write-wins rule.
    pub unchanged: usize,
}

/// One row of the product pickup summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupRow {
    pub product_id: String,
    pub name: String,
    pub quantity: u64,
}

/// The reconciliation engine.
pub struct FulfillmentEngine {
    carrier: CarrierClient,
    storefront: StorefrontClient,
    addresser: AddresserClient,
    replica: ReplicaStore,
    sender: SenderConfig,
    downloads_dir: PathBuf,
    poll_policy: PollPolicy,
}

impl FulfillmentEngine {
    /// Assemble the engine from its gateways.
    #[must_use]
    pub fn new(
        carrier: CarrierClient,
        storefront: StorefrontClient,
        addresser: AddresserClient,
        replica: ReplicaStore,
        sender: SenderConfig,
        downloads_dir: PathBuf,
    ) -> Self {
        Self {
            carrier,
            storefront,
            addresser,
            replica,
            sender,
            downloads_dir,
            poll_policy: PollPolicy::default(),
        }
    }

    /// Override the label poll pacing.
    #[must_use]
    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }

    /// The replica store, for collection management.
    #[must_use]
    pub const fn replica(&self) -> &ReplicaStore {
        &self.replica
    }

    /// The storefront gateway, for ad-hoc queries.
    #[must_use]
    pub const fn storefront(&self) -> &StorefrontClient {
        &self.storefront
    }

    /// The carrier gateway, for authentication and ad-hoc queries.
    #[must_use]
    pub const fn carrier(&self) -> &CarrierClient {
        &self.carrier
    }

    // =========================================================================
    // Shipment pipeline
    // =========================================================================

    /// Create a shipment for an order: build the request, create the
    /// pre-postagem, replicate the record, and write the storefront
    /// fulfillment with the returned tracking code.
    ///
    /// # Errors
    ///
    /// Fails when the order is missing or unshippable, the delivery option
    /// is unmapped, or any gateway call fails. There is no rollback: a
    /// failure after the carrier call leaves the shipment created.
    #[instrument(skip(self), fields(order_number = %order_number))]
    pub async fn create_shipment(
        &self,
        order_number: &str,
    ) -> Result<ShipmentRecord, EngineError> {
        let order = self.find_order(order_number).await?;
        let address = order
            .shipping_address()
            .ok_or_else(|| EngineError::MissingShippingAddress(order.number.clone()))?;

        // An unknown CEP proceeds with empty canonical fields; only
        // transport failures abort.
        let resolved = self
            .carrier
            .resolve_address(&address.zip_code)
            .await?
            .unwrap_or_default();

        let request = mapping::shipment_request(&order, &resolved, &self.sender)?;
        let record = self.carrier.create_shipment(&request).await?;

        if let Some(id) = record.replica_id() {
            let doc = serde_json::to_value(&record)?;
            self.replica
                .upsert(Collection::Shipments, id, Utc::now(), &doc)
                .await?;
        }

        let object_code = record
            .object_code
            .clone()
            .ok_or_else(|| EngineError::MissingObjectCode(order.number.clone()))?;
        self.create_fulfillment_on(&order, &object_code).await?;

        tracing::info!(order_number = %order.number, object_code = %object_code, "shipment created");
        Ok(record)
    }

    /// Cancel an order's shipments and remove its storefront fulfillments.
    ///
    /// One cancel call per tracked fulfillment; a failing cancel is
    /// recorded and does not stop the others. Fulfillments are deleted
    /// afterwards regardless.
    ///
    /// # Errors
    ///
    /// Fails when the order is missing or the fulfillment deletion fails.
    #[instrument(skip(self), fields(order_number = %order_number))]
    pub async fn cancel_shipment(&self, order_number: &str) -> Result<CancelReport, EngineError> {
        let order = self.find_order(order_number).await?;

        let mut report = CancelReport::default();
        for object_code in order.tracking_numbers() {
            match self.carrier.cancel_shipment(&object_code).await {
                Ok(()) => report.canceled.push(object_code),
                Err(error) => {
                    tracing::warn!(%error, %object_code, "shipment cancel failed");
                    report.failed.push(FailedCancel {
                        object_code,
                        error: error.to_string(),
                    });
                }
            }
        }

        self.delete_fulfillments_on(&order, None).await?;
        Ok(report)
    }

    /// Query pre-postagens at the carrier.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway call fails.
    pub async fn shipments(
        &self,
        query: &ShipmentQuery,
    ) -> Result<Vec<ShipmentRecord>, EngineError> {
        Ok(self.carrier.query_shipments(query).await?)
    }

    // =========================================================================
    // Fulfillment sync
    // =========================================================================

    /// Create a storefront fulfillment for an order and tracking code.
    ///
    /// # Errors
    ///
    /// Fails when the order is missing or the storefront call fails.
    #[instrument(skip(self), fields(order_number = %order_number, tracking_number = %tracking_number))]
    pub async fn create_fulfillment(
        &self,
        order_number: &str,
        tracking_number: &str,
    ) -> Result<(), EngineError> {
        let order = self.find_order(order_number).await?;
        self.create_fulfillment_on(&order, tracking_number).await
    }

    /// Delete one fulfillment (by id) or all of them from an order.
    /// Returns the number deleted.
    ///
    /// # Errors
    ///
    /// Fails when the order is missing or a storefront call fails.
    #[instrument(skip(self), fields(order_number = %order_number))]
    pub async fn delete_fulfillments(
        &self,
        order_number: &str,
        fulfillment_id: Option<&str>,
    ) -> Result<usize, EngineError> {
        let order = self.find_order(order_number).await?;
        self.delete_fulfillments_on(&order, fulfillment_id).await
    }

    async fn create_fulfillment_on(
        &self,
        order: &Order,
        tracking_number: &str,
    ) -> Result<(), EngineError> {
        let line_items = order
            .line_items
            .iter()
            .map(|item| FulfillmentLineItem {
                index: item.index,
                quantity: item.quantity,
            })
            .collect();

        let request = FulfillmentRequest {
            line_items,
            tracking_info: TrackingInfo {
                tracking_number: Some(tracking_number.to_string()),
                shipping_provider: Some(TRACKING_PROVIDER.to_string()),
                tracking_link: Some(tracking_link(tracking_number)),
            },
        };

        self.storefront
            .create_fulfillment(&order.id, &request)
            .await?;
        Ok(())
    }

    async fn delete_fulfillments_on(
        &self,
        order: &Order,
        fulfillment_id: Option<&str>,
    ) -> Result<usize, EngineError> {
        let mut deleted = 0;
        for fulfillment in &order.fulfillments {
            if fulfillment_id.is_none_or(|id| id == fulfillment.id) {
                self.storefront
                    .delete_fulfillment(&order.id, &fulfillment.id)
                    .await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    // =========================================================================
    // Address pipelines
    // =========================================================================

    /// Submit the orders to the bulk address-correction service in groups
    /// of [`CORRECTION_BATCH_SIZE`].
    ///
    /// Orders without shipment details are ignored; orders whose address
    /// cannot be resolved or whose CEP is malformed are reported in the
    /// outcome's `skipped` list. The last partial batch is still sent.
    ///
    /// # Errors
    ///
    /// Fails when a batch submission fails.
    #[instrument(skip(self, orders), fields(orders = orders.len()))]
    pub async fn correct_addresses(
        &self,
        orders: &[Order],
    ) -> Result<CorrectionOutcome, EngineError> {
        let mut recipients = Vec::new();
        let mut skipped = Vec::new();

        for order in orders {
            let Some(address) = order.shipping_address() else {
                continue;
            };

            let resolved = match self.carrier.resolve_address(&address.zip_code).await {
                Ok(Some(resolved)) => resolved,
                Ok(None) => ResolvedAddress::default(),
                Err(error) => {
                    skipped.push(SkippedOrder {
                        number: order.number.clone(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            match batching::correction_recipient(order, &resolved, &self.sender) {
                Ok(recipient) => recipients.push(recipient),
                Err(error) => skipped.push(SkippedOrder {
                    number: order.number.clone(),
                    reason: error.to_string(),
                }),
            }
        }

        let sender = batching::correction_sender(&self.sender);
        let mut artifacts = Vec::new();
        for chunk in recipients.chunks(CORRECTION_BATCH_SIZE) {
            let batch = CorrectionBatch {
                sender: sender.clone(),
                recipients: chunk.to_vec(),
            };
            artifacts.push(self.addresser.submit_batch(&batch).await?);
        }

        Ok(CorrectionOutcome { artifacts, skipped })
    }

    /// Flag orders whose freeform street diverges from the carrier's
    /// canonical street for the same postal code.
    ///
    /// Failed resolutions score against the empty canonical street and thus
    /// show up in the report. Findings come back sorted by order number.
    ///
    /// # Errors
    ///
    /// Currently infallible at the gateway level (failures degrade to empty
    /// canonical addresses); the `Result` covers future policy changes.
    #[instrument(skip(self, orders), fields(orders = orders.len()))]
    pub async fn reconcile_addresses(
        &self,
        orders: &[Order],
    ) -> Result<Vec<AddressFinding>, EngineError> {
        let mut findings = Vec::new();

        for order in orders {
            let Some(address) = order.shipping_address() else {
                continue;
            };

            let resolved = match self.carrier.resolve_address(&address.zip_code).await {
                Ok(Some(resolved)) => resolved,
                Ok(None) => ResolvedAddress::default(),
                Err(error) => {
                    tracing::warn!(%error, order_number = %order.number, "address resolution failed");
                    ResolvedAddress::default()
                }
            };

            if let Some(finding) = reconcile::finding(order, &resolved) {
                findings.push(finding);
            }
        }

        reconcile::sort_findings(&mut findings);
        Ok(findings)
    }

    // =========================================================================
    // Artifacts
    // =========================================================================

    /// Request and download the PDF labels for every tracked fulfillment in
    /// the order set. Returns the written file path, or `None` when there
    /// is nothing to print or generation did not finish within the poll
    /// budget.
    ///
    /// # Errors
    ///
    /// Fails when a gateway call fails or the file cannot be written.
    #[instrument(skip(self, orders), fields(orders = orders.len()))]
    pub async fn download_labels(&self, orders: &[Order]) -> Result<Option<PathBuf>, EngineError> {
        let object_codes: Vec<String> =
            orders.iter().flat_map(Order::tracking_numbers).collect();
        if object_codes.is_empty() {
            return Ok(None);
        }

        let receipt = self.carrier.request_labels(&object_codes).await?;

        let mut state = LabelState::Submitted;
        let pdf = loop {
            let Some(polls_done) = state.polls_done() else {
                break None;
            };
            tokio::time::sleep(self.poll_policy.delay_for(polls_done)).await;

            let outcome = self.carrier.download_labels(&receipt.receipt_id).await?;
            state = state.advance(outcome, &self.poll_policy);

            if let LabelState::Ready(pdf) = &state {
                break Some(pdf.clone());
            }
        };

        let Some(pdf) = pdf else {
            tracing::warn!(receipt_id = %receipt.receipt_id, "label generation did not finish in time");
            return Ok(None);
        };

        let bytes = pdf.decode_bytes()?;
        let path = self.write_artifact(&pdf.name, &bytes).await?;
        Ok(Some(path))
    }

    /// Download the HTML content declaration for an order's first tracked
    /// shipment that has one. Returns the written file path.
    ///
    /// # Errors
    ///
    /// Fails when the order is missing, a gateway call fails, or the file
    /// cannot be written.
    #[instrument(skip(self), fields(order_number = %order_number))]
    pub async fn download_content_declaration(
        &self,
        order_number: &str,
    ) -> Result<Option<PathBuf>, EngineError> {
        let order = self.find_order(order_number).await?;

        for object_code in order.tracking_numbers() {
            let query = ShipmentQuery {
                object_code: Some(object_code.clone()),
                ..ShipmentQuery::default()
            };
            let records = self.carrier.query_shipments(&query).await?;
            let Some(shipment_id) = records.into_iter().find_map(|record| record.id) else {
                continue;
            };
            let Some(html) = self.carrier.content_declaration(&shipment_id).await? else {
                continue;
            };

            let filename = format!("{}-{}.html", order.number, object_code);
            let path = self.write_artifact(&filename, html.as_bytes()).await?;
            return Ok(Some(path));
        }

        Ok(None)
    }

    async fn write_artifact(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, EngineError> {
        tokio::fs::create_dir_all(&self.downloads_dir).await?;
        let path = self.downloads_dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), "artifact written");
        Ok(path)
    }

    // =========================================================================
    // Replication
    // =========================================================================

    /// Mirror the orders into the replica store under last-write-wins.
    ///
    /// # Errors
    ///
    /// Fails when serialization or a store write fails.
    #[instrument(skip(self, orders), fields(orders = orders.len()))]
    pub async fn replicate_orders(&self, orders: &[Order]) -> Result<ReplicaSummary, EngineError> {
        let mut summary = ReplicaSummary::default();

        for order in orders {
            let doc = serde_json::to_value(order)?;
            let applied = self
                .replica
                .upsert(Collection::Orders, &order.id, order.last_updated, &doc)
                .await?;
            if applied {
                summary.applied += 1;
            } else {
                summary.unchanged += 1;
            }
        }

        Ok(summary)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Fetch one order by number.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OrderNotFound`] when the storefront has no
    /// such order.
    pub async fn find_order(&self, order_number: &str) -> Result<Order, EngineError> {
        let filter = OrderQueryFilter {
            numbers: Some(vec![order_number.to_string()]),
            ..OrderQueryFilter::default()
        };
        let page = self
            .storefront
            .query_orders(&filter, OrderQuerySort::NumberAsc, 0)
            .await?;

        page.orders
            .into_iter()
            .find(|order| order.number == order_number)
            .ok_or_else(|| EngineError::OrderNotFound(order_number.to_string()))
    }
}

/// Public tracking page for a Correios object code.
fn tracking_link(object_code: &str) -> String {
    format!("https://www.websro.com.br/rastreamento-correios.php?P_COD_UNI={object_code}")
}

/// Aggregate line-item quantities per product across an order set, for the
/// warehouse pickup list. Rows are sorted by product id.
#[must_use]
pub fn pickup_summary(orders: &[Order]) -> Vec<PickupRow> {
    let mut totals: BTreeMap<&str, PickupRow> = BTreeMap::new();

    for order in orders {
        for item in &order.line_items {
            totals
                .entry(item.product_id.as_str())
                .and_modify(|row| row.quantity += u64::from(item.quantity))
                .or_insert_with(|| PickupRow {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    quantity: u64::from(item.quantity),
                });
        }
    }

    totals.into_values().collect()
}
