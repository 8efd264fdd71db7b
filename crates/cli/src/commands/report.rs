//! Data-quality and warehouse reports.
//!
//! # Usage
//!
//! ```bash
//! despacho report addresses --created-after 2024-03-01T00:00:00Z
//! despacho report pickup --payment-status PAID
//! ```

use despacho_fulfillment::engine::{AddressFinding, PickupRow, pickup_summary};

use super::{CommandError, OrderSelection, context, select_orders};

/// Print the address-inconsistency report for the selected orders.
pub async fn addresses(selection: &OrderSelection) -> Result<(), CommandError> {
    let ctx = context().await?;
    let page = select_orders(&ctx.engine, selection).await?;

    let findings = ctx.engine.reconcile_addresses(&page.orders).await?;
    print_findings(page.number_summary(), &findings);
    Ok(())
}

/// Print the aggregated product pickup list for the selected orders.
pub async fn pickup(selection: &OrderSelection) -> Result<(), CommandError> {
    let ctx = context().await?;
    let page = select_orders(&ctx.engine, selection).await?;

    let rows = pickup_summary(&page.orders);
    print_pickup(page.number_summary(), &rows);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_findings(number_summary: &str, findings: &[AddressFinding]) {
    println!("Order numbers: {number_summary}\n");
    println!(
        "{:<8} {:<14} {:<26} {:<26} {:>5}  {:<16} {:<16}",
        "Order", "Name", "Order street", "Canonical street", "Score", "Order city", "Canonical city"
    );
    for finding in findings {
        println!(
            "{:<8} {:<14} {:<26} {:<26} {:>5}  {:<16} {:<16}",
            finding.order_number,
            finding.recipient_name,
            finding.order_street,
            finding.canonical_street,
            finding.score,
            finding.order_city,
            finding.canonical_city,
        );
    }
}

#[allow(clippy::print_stdout)]
fn print_pickup(number_summary: &str, rows: &[PickupRow]) {
    println!("Order numbers: {number_summary}\n");
    println!("{:<24} {:<32} {:>8}", "Product ID", "Name", "Quantity");
    for row in rows {
        println!("{:<24} {:<32} {:>8}", row.product_id, row.name, row.quantity);
    }
}
